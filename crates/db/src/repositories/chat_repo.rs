//! Repository for the `chats` table.

use servicedesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::chat::Chat;

const COLUMNS: &str = "id, booking_id, is_open, closed_at, created_at";

/// Provides lookups and the one-way close for chats.
pub struct ChatRepo;

impl ChatRepo {
    /// Find a chat by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Chat>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM chats WHERE id = $1");
        sqlx::query_as::<_, Chat>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the chat of a booking.
    pub async fn find_by_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Option<Chat>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM chats WHERE booking_id = $1");
        sqlx::query_as::<_, Chat>(&query)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
    }

    /// Close an open chat.
    ///
    /// Returns `None` if the chat does not exist or was already closed.
    pub async fn close(pool: &PgPool, id: DbId) -> Result<Option<Chat>, sqlx::Error> {
        let query = format!(
            "UPDATE chats SET is_open = false, closed_at = NOW()
             WHERE id = $1 AND is_open = true
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Chat>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
