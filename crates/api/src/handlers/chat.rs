//! Handlers for booking chats (`/chats`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use servicedesk_core::chat::{is_message_visible, MessageDraft};
use servicedesk_core::error::CoreError;
use servicedesk_core::transcript::{
    render_transcript, transcript_filename, TranscriptEntry, TranscriptHeader,
};
use servicedesk_core::types::DbId;
use servicedesk_db::models::chat::Chat;
use servicedesk_db::models::message::{Message, MessageRow};
use servicedesk_db::repositories::{BookingRepo, MessageRepo};
use validator::Validate;

use crate::access::load_chat_context;
use crate::error::{AppError, AppResult};
use crate::lifecycle;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireApproved;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /chats/{id}/messages`.
#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[serde(default)]
    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub content: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_quotation: bool,
    pub quotation_amount: Option<f64>,
    #[validate(url(message = "must be a valid URL"))]
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
}

/// GET /api/v1/chats/{id}
pub async fn get_chat(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Chat>>> {
    let ctx = load_chat_context(&state.pool, &auth, id).await?;
    Ok(Json(DataResponse { data: ctx.chat }))
}

/// GET /api/v1/chats/{id}/messages
///
/// Messages visible to the caller, oldest first.
pub async fn list_messages(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Message>>>> {
    load_chat_context(&state.pool, &auth, id).await?;
    let messages = visible_messages(&state, &auth, id)
        .await?
        .into_iter()
        .map(Message::from)
        .collect();
    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/v1/chats/{id}/messages
pub async fn post_message(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PostMessageRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let ctx = load_chat_context(&state.pool, &auth, id).await?;

    let draft = MessageDraft {
        content: input.content,
        is_private: input.is_private,
        is_quotation: input.is_quotation,
        quotation_amount: input.quotation_amount,
        attachment_url: input.attachment_url,
        attachment_type: input.attachment_type,
    };
    let message = lifecycle::post_message(&state, &ctx, &auth, draft).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}

/// POST /api/v1/chats/{id}/close
///
/// Close the chat and complete its booking. Assigned staff and admins only.
pub async fn close_chat(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Chat>>> {
    let ctx = load_chat_context(&state.pool, &auth, id).await?;
    let chat = lifecycle::close_chat(&state, &ctx, &auth).await?;
    Ok(Json(DataResponse { data: chat }))
}

/// GET /api/v1/chats/{id}/transcript
///
/// Plain-text transcript of the messages the caller can see.
pub async fn transcript(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let ctx = load_chat_context(&state.pool, &auth, id).await?;
    let detail = BookingRepo::find_detail(&state.pool, ctx.booking.id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Booking",
            id: ctx.booking.id,
        }))?;

    let header = TranscriptHeader {
        booking_id: detail.id,
        service_name: detail.service_name,
        customer_name: detail.customer_name,
        booking_status: detail.status,
        chat_open: ctx.chat.is_open,
        exported_at: Utc::now(),
    };
    let entries: Vec<TranscriptEntry> = visible_messages(&state, &auth, id)
        .await?
        .into_iter()
        .map(|m| TranscriptEntry {
            sent_at: m.created_at,
            sender_name: m.sender_name,
            sender_role: m.sender_role,
            content: m.content,
            is_private: m.is_private,
            quotation_amount: m.quotation_amount.filter(|_| m.is_quotation),
            attachment_url: m.attachment_url,
            attachment_type: m.attachment_type,
        })
        .collect();

    let body = render_transcript(&header, &entries);
    Ok((
        [
            (
                axum::http::header::CONTENT_TYPE,
                "text/plain; charset=utf-8".to_string(),
            ),
            (
                axum::http::header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    transcript_filename(header.booking_id)
                ),
            ),
        ],
        body,
    ))
}

async fn visible_messages(
    state: &AppState,
    viewer: &AuthUser,
    chat_id: DbId,
) -> AppResult<Vec<MessageRow>> {
    let rows = MessageRepo::list_for_chat(&state.pool, chat_id).await?;
    Ok(rows
        .into_iter()
        .filter(|m| is_message_visible(m.is_private, m.sender_id, viewer.user_id, &viewer.role))
        .collect())
}
