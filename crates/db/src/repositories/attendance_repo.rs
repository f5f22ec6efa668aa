//! Repository for the `attendance_records` table.

use chrono::NaiveDate;
use servicedesk_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::attendance::AttendanceRecord;

const COLUMNS: &str =
    "id, user_id, work_date, clock_in_at, clock_out_at, worked_minutes, notes";

/// Provides clock-in/clock-out persistence.
pub struct AttendanceRepo;

impl AttendanceRepo {
    /// The user's open session, if any.
    pub async fn find_open(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_records
             WHERE user_id = $1 AND clock_out_at IS NULL"
        );
        sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Open a session dated today (UTC).
    pub async fn clock_in(
        pool: &PgPool,
        user_id: DbId,
        notes: Option<&str>,
    ) -> Result<AttendanceRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO attendance_records (user_id, work_date, notes)
             VALUES ($1, (NOW() AT TIME ZONE 'UTC')::date, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(user_id)
            .bind(notes)
            .fetch_one(pool)
            .await
    }

    /// Close a session with its computed duration.
    pub async fn clock_out(
        pool: &PgPool,
        id: DbId,
        clock_out_at: Timestamp,
        worked_minutes: i32,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE attendance_records SET clock_out_at = $2, worked_minutes = $3
             WHERE id = $1 AND clock_out_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(id)
            .bind(clock_out_at)
            .bind(worked_minutes)
            .fetch_optional(pool)
            .await
    }

    /// Records within an optional date range, newest first.
    pub async fn list(
        pool: &PgPool,
        user_id: Option<DbId>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_records
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::DATE IS NULL OR work_date >= $2)
               AND ($3::DATE IS NULL OR work_date <= $3)
             ORDER BY clock_in_at DESC, id DESC"
        );
        sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }
}
