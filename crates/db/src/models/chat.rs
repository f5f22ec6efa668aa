//! Chat entity model.

use serde::Serialize;
use servicedesk_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `chats` table. One chat per booking.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Chat {
    pub id: DbId,
    pub booking_id: DbId,
    pub is_open: bool,
    pub closed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
