//! Repository for the `messages` table.

use servicedesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::message::{CreateMessage, MessageRow};

/// Message columns joined with the sender, over `messages m` and `users u`.
const COLUMNS: &str = "m.id, m.chat_id, m.sender_id, m.content, m.is_private, \
     m.is_quotation, m.quotation_amount, m.attachment_url, m.attachment_type, \
     m.created_at, u.name AS sender_name, u.role AS sender_role";

/// Provides message persistence.
pub struct MessageRepo;

impl MessageRepo {
    /// Insert a message if its chat is still open.
    ///
    /// The open check and the insert are one statement, so a message can
    /// never land in a closed chat. Returns `None` when the chat is closed
    /// or missing.
    pub async fn create_if_open(
        pool: &PgPool,
        input: &CreateMessage,
    ) -> Result<Option<MessageRow>, sqlx::Error> {
        let query = format!(
            "WITH m AS (
                 INSERT INTO messages
                     (chat_id, sender_id, content, is_private, is_quotation,
                      quotation_amount, attachment_url, attachment_type)
                 SELECT $1, $2, $3, $4, $5, $6, $7, $8
                 WHERE EXISTS (SELECT 1 FROM chats WHERE id = $1 AND is_open = true)
                 RETURNING *
             )
             SELECT {COLUMNS} FROM m JOIN users u ON u.id = m.sender_id"
        );
        sqlx::query_as::<_, MessageRow>(&query)
            .bind(input.chat_id)
            .bind(input.sender_id)
            .bind(&input.content)
            .bind(input.is_private)
            .bind(input.is_quotation)
            .bind(input.quotation_amount)
            .bind(&input.attachment_url)
            .bind(&input.attachment_type)
            .fetch_optional(pool)
            .await
    }

    /// All messages of a chat in chronological order.
    pub async fn list_for_chat(
        pool: &PgPool,
        chat_id: DbId,
    ) -> Result<Vec<MessageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages m JOIN users u ON u.id = m.sender_id
             WHERE m.chat_id = $1
             ORDER BY m.created_at, m.id"
        );
        sqlx::query_as::<_, MessageRow>(&query)
            .bind(chat_id)
            .fetch_all(pool)
            .await
    }
}
