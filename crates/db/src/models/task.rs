//! Task entity model.

use serde::Serialize;
use servicedesk_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `tasks` table: one staff member's share of a booking.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub booking_id: DbId,
    pub staff_id: DbId,
    pub description: String,
    pub status: String,
    /// JSON array of attachment URLs.
    pub attachments: serde_json::Value,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A task joined with booking and service context for task lists.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskDetail {
    pub id: DbId,
    pub booking_id: DbId,
    pub staff_id: DbId,
    pub description: String,
    pub status: String,
    pub attachments: serde_json::Value,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub staff_name: String,
    pub service_name: String,
    pub booking_status: String,
}
