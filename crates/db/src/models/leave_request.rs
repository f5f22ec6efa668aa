//! Leave request model and DTOs.

use chrono::NaiveDate;
use serde::Serialize;
use servicedesk_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `leave_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeaveRequest {
    pub id: DbId,
    pub user_id: DbId,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i32,
    pub reason: String,
    pub status: String,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for filing a leave request. `days` is computed by the caller.
#[derive(Debug, Clone)]
pub struct CreateLeaveRequest {
    pub user_id: DbId,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i32,
    pub reason: String,
}
