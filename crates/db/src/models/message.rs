//! Chat message models.

use serde::{Deserialize, Serialize};
use servicedesk_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A message row joined with its sender's name and role.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: DbId,
    pub chat_id: DbId,
    pub sender_id: DbId,
    pub content: String,
    pub is_private: bool,
    pub is_quotation: bool,
    pub quotation_amount: Option<f64>,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub created_at: Timestamp,
    pub sender_name: String,
    pub sender_role: String,
}

/// Sender summary embedded in every message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageSender {
    pub id: DbId,
    pub name: String,
    pub role: String,
}

/// API and real-time representation of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: DbId,
    pub chat_id: DbId,
    pub content: String,
    pub is_private: bool,
    pub is_quotation: bool,
    pub quotation_amount: Option<f64>,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub created_at: Timestamp,
    pub sender: MessageSender,
}

impl From<MessageRow> for Message {
    fn from(r: MessageRow) -> Self {
        Self {
            id: r.id,
            chat_id: r.chat_id,
            content: r.content,
            is_private: r.is_private,
            is_quotation: r.is_quotation,
            quotation_amount: r.quotation_amount,
            attachment_url: r.attachment_url,
            attachment_type: r.attachment_type,
            created_at: r.created_at,
            sender: MessageSender {
                id: r.sender_id,
                name: r.sender_name,
                role: r.sender_role,
            },
        }
    }
}

/// DTO for inserting a validated message.
#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub chat_id: DbId,
    pub sender_id: DbId,
    pub content: String,
    pub is_private: bool,
    pub is_quotation: bool,
    pub quotation_amount: Option<f64>,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
}
