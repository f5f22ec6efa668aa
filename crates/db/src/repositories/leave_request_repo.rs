//! Repository for the `leave_requests` table.

use servicedesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::leave_request::{CreateLeaveRequest, LeaveRequest};

const COLUMNS: &str = "id, user_id, leave_type, start_date, end_date, days, reason, status, \
                       reviewed_by, reviewed_at, created_at";

/// Result of [`LeaveRequestRepo::review`].
#[derive(Debug)]
pub enum ReviewOutcome {
    Reviewed(LeaveRequest),
    /// The request left `pending` before this review was applied.
    AlreadyReviewed,
    /// Consuming the requested days would exceed the user's quota.
    InsufficientQuota,
}

/// Provides persistence for leave requests.
pub struct LeaveRequestRepo;

impl LeaveRequestRepo {
    /// File a new pending request.
    pub async fn create(
        pool: &PgPool,
        input: &CreateLeaveRequest,
    ) -> Result<LeaveRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO leave_requests (user_id, leave_type, start_date, end_date, days, reason)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LeaveRequest>(&query)
            .bind(input.user_id)
            .bind(&input.leave_type)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.days)
            .bind(&input.reason)
            .fetch_one(pool)
            .await
    }

    /// Find a request by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<LeaveRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leave_requests WHERE id = $1");
        sqlx::query_as::<_, LeaveRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List requests, newest first, optionally for one user and status.
    pub async fn list(
        pool: &PgPool,
        user_id: Option<DbId>,
        status: Option<&str>,
    ) -> Result<Vec<LeaveRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM leave_requests
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, LeaveRequest>(&query)
            .bind(user_id)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// Record a review decision and consume `quota_days` from the requester's
    /// quota, in one transaction.
    ///
    /// The status change only applies while the request is still pending and
    /// the quota update only while enough days remain; otherwise nothing is
    /// written.
    pub async fn review(
        pool: &PgPool,
        id: DbId,
        status: &str,
        reviewer_id: DbId,
        quota_days: i32,
    ) -> Result<ReviewOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE leave_requests
             SET status = $2, reviewed_by = $3, reviewed_at = NOW()
             WHERE id = $1 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        let Some(request) = sqlx::query_as::<_, LeaveRequest>(&query)
            .bind(id)
            .bind(status)
            .bind(reviewer_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(ReviewOutcome::AlreadyReviewed);
        };

        if quota_days > 0 {
            let result = sqlx::query(
                "UPDATE users SET leave_quota_used = leave_quota_used + $2
                 WHERE id = $1 AND leave_quota_used + $2 <= leave_quota_total",
            )
            .bind(request.user_id)
            .bind(quota_days)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(ReviewOutcome::InsufficientQuota);
            }
        }

        tx.commit().await?;
        Ok(ReviewOutcome::Reviewed(request))
    }
}
