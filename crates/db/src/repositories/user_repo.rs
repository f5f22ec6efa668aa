//! Repository for the `users` table.

use servicedesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, email, phone, password_hash, role, is_approved, \
                       leave_quota_total, leave_quota_used, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    ///
    /// A duplicate email fails with a unique violation on `uq_users_email`.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, email, phone, password_hash, role, is_approved)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.password_hash)
            .bind(&input.role)
            .bind(input.is_approved)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// List users, newest first, optionally restricted to one role.
    pub async fn list(pool: &PgPool, role: Option<&str>) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE ($1::TEXT IS NULL OR role = $1)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(role)
            .fetch_all(pool)
            .await
    }

    /// Return the users with the given role among `ids`.
    ///
    /// Used to check that every id of an assignment request is a staff member.
    pub async fn find_by_ids_with_role(
        pool: &PgPool,
        ids: &[DbId],
        role: &str,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = ANY($1) AND role = $2");
        sqlx::query_as::<_, User>(&query)
            .bind(ids)
            .bind(role)
            .fetch_all(pool)
            .await
    }

    /// Set or clear the approval flag. Returns `None` if the user does not exist.
    pub async fn set_approval(
        pool: &PgPool,
        id: DbId,
        approved: bool,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET is_approved = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(approved)
            .fetch_optional(pool)
            .await
    }

    /// Delete users and everything that references them in one transaction.
    ///
    /// Removes their notifications, attendance, leave requests, tasks and
    /// messages, then the bookings they own (with those bookings' chats,
    /// messages and tasks), then the users. Bookings where a deleted user is
    /// only the primary assignee keep existing with the reference cleared by
    /// the foreign key. Returns the number of users deleted.
    pub async fn bulk_delete(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let owned_bookings: Vec<DbId> =
            sqlx::query_scalar("SELECT id FROM bookings WHERE customer_id = ANY($1)")
                .bind(ids)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM notifications WHERE user_id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM attendance_records WHERE user_id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM leave_requests WHERE user_id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM tasks WHERE staff_id = ANY($1) OR booking_id = ANY($2)")
            .bind(ids)
            .bind(&owned_bookings)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "DELETE FROM messages
             WHERE sender_id = ANY($1)
                OR chat_id IN (SELECT id FROM chats WHERE booking_id = ANY($2))",
        )
        .bind(ids)
        .bind(&owned_bookings)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM chats WHERE booking_id = ANY($1)")
            .bind(&owned_bookings)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM bookings WHERE id = ANY($1)")
            .bind(&owned_bookings)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
