//! Repository for the `tasks` table.

use servicedesk_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::task::{Task, TaskDetail};

const COLUMNS: &str = "id, booking_id, staff_id, description, status, attachments, \
                       completed_at, created_at, updated_at";

const DETAIL_COLUMNS: &str = "t.id, t.booking_id, t.staff_id, t.description, t.status, \
     t.attachments, t.completed_at, t.created_at, t.updated_at, \
     u.name AS staff_name, s.name AS service_name, b.status AS booking_status";

/// Provides CRUD operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Create the task of `staff_id` on a booking.
    ///
    /// Idempotent per (booking, staff): returns `None` when the pair already
    /// has a task, including when a concurrent request created it first.
    pub async fn create_for_staff(
        pool: &PgPool,
        booking_id: DbId,
        staff_id: DbId,
        description: &str,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (booking_id, staff_id, description)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_tasks_booking_staff DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(booking_id)
            .bind(staff_id)
            .bind(description)
            .fetch_optional(pool)
            .await
    }

    /// Find a task by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Tasks of a booking in assignment order.
    pub async fn list_for_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks WHERE booking_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(booking_id)
            .fetch_all(pool)
            .await
    }

    /// Task list with booking context, newest first.
    pub async fn list_details(
        pool: &PgPool,
        staff_id: Option<DbId>,
        booking_id: Option<DbId>,
        status: Option<&str>,
    ) -> Result<Vec<TaskDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {DETAIL_COLUMNS}
             FROM tasks t
             JOIN users u ON u.id = t.staff_id
             JOIN bookings b ON b.id = t.booking_id
             JOIN services s ON s.id = b.service_id
             WHERE ($1::BIGINT IS NULL OR t.staff_id = $1)
               AND ($2::BIGINT IS NULL OR t.booking_id = $2)
               AND ($3::TEXT IS NULL OR t.status = $3)
             ORDER BY t.created_at DESC, t.id DESC"
        );
        sqlx::query_as::<_, TaskDetail>(&query)
            .bind(staff_id)
            .bind(booking_id)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// Staff ids holding a task on the booking, oldest task first.
    pub async fn assignee_ids(pool: &PgPool, booking_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT staff_id FROM tasks WHERE booking_id = $1 ORDER BY created_at, id",
        )
        .bind(booking_id)
        .fetch_all(pool)
        .await
    }

    /// Status string of every task of the booking.
    pub async fn statuses_for_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT status FROM tasks WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_all(pool)
            .await
    }

    /// Write a task's status, completion time and optionally its attachments.
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        status: &str,
        completed_at: Option<Timestamp>,
        attachments: Option<&serde_json::Value>,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET
                status = $2,
                completed_at = $3,
                attachments = COALESCE($4, attachments)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(status)
            .bind(completed_at)
            .bind(attachments)
            .fetch_optional(pool)
            .await
    }

    /// Delete the task(s) of a staff member on a booking. Returns rows removed.
    pub async fn delete_by_booking_and_staff(
        pool: &PgPool,
        booking_id: DbId,
        staff_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE booking_id = $1 AND staff_id = $2")
            .bind(booking_id)
            .bind(staff_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
