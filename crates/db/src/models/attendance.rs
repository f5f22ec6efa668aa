//! Attendance record model.

use chrono::NaiveDate;
use serde::Serialize;
use servicedesk_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `attendance_records` table. `clock_out_at` is `NULL`
/// while the session is open.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttendanceRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub work_date: NaiveDate,
    pub clock_in_at: Timestamp,
    pub clock_out_at: Option<Timestamp>,
    pub worked_minutes: Option<i32>,
    pub notes: Option<String>,
}
