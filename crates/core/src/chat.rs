//! Message visibility and posting rules for booking chats.

use crate::error::CoreError;
use crate::roles::{is_service_side, ROLE_CUSTOMER};
use crate::types::DbId;

/// Attachment kinds accepted on messages and returned by the upload endpoint.
pub const ATTACHMENT_IMAGE: &str = "image";
pub const ATTACHMENT_VIDEO: &str = "video";
pub const ATTACHMENT_DOCUMENT: &str = "document";

/// Whether a viewer may see a message.
///
/// Customers never see private messages written by someone else; staff and
/// admins see everything.
pub fn is_message_visible(
    is_private: bool,
    sender_id: DbId,
    viewer_id: DbId,
    viewer_role: &str,
) -> bool {
    !is_private || sender_id == viewer_id || viewer_role != ROLE_CUSTOMER
}

/// A message as submitted by a client, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub content: String,
    pub is_private: bool,
    pub is_quotation: bool,
    pub quotation_amount: Option<f64>,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
}

/// Normalise and validate a draft for the given sender role.
///
/// Customers cannot write private notes (the flag is dropped) and cannot
/// issue quotations. A quotation must carry a positive amount, and a message
/// needs either text or an attachment.
pub fn prepare_message(mut draft: MessageDraft, sender_role: &str) -> Result<MessageDraft, CoreError> {
    draft.content = draft.content.trim().to_string();
    draft.attachment_url = draft
        .attachment_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    if draft.content.is_empty() && draft.attachment_url.is_none() {
        return Err(CoreError::Validation(
            "Message content or an attachment is required".into(),
        ));
    }

    if !is_service_side(sender_role) {
        draft.is_private = false;
        if draft.is_quotation {
            return Err(CoreError::Forbidden(
                "Only staff or admins can send quotations".into(),
            ));
        }
    }

    if draft.is_quotation {
        match draft.quotation_amount {
            Some(amount) if amount.is_finite() && amount > 0.0 => {}
            _ => {
                return Err(CoreError::Validation(
                    "A quotation requires a positive quotation_amount".into(),
                ))
            }
        }
    } else {
        draft.quotation_amount = None;
    }

    if draft.attachment_url.is_none() {
        draft.attachment_type = None;
    } else if draft.attachment_type.is_none() {
        draft.attachment_type = Some(ATTACHMENT_DOCUMENT.to_string());
    }

    Ok(draft)
}

/// Classify an uploaded file by its MIME type.
pub fn attachment_type_for_mime(mime: &str) -> &'static str {
    if mime.starts_with("image/") {
        ATTACHMENT_IMAGE
    } else if mime.starts_with("video/") {
        ATTACHMENT_VIDEO
    } else {
        ATTACHMENT_DOCUMENT
    }
}
