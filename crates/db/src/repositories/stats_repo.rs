//! Read-only aggregates for the admin dashboard.

use sqlx::PgPool;

use crate::models::stats::{DashboardStats, LabelCount};

/// Provides dashboard queries.
pub struct StatsRepo;

impl StatsRepo {
    /// Collect every dashboard figure.
    pub async fn dashboard(pool: &PgPool) -> Result<DashboardStats, sqlx::Error> {
        let bookings_by_status = sqlx::query_as::<_, LabelCount>(
            "SELECT status AS label, COUNT(*) AS count FROM bookings GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await?;

        let users_by_role = sqlx::query_as::<_, LabelCount>(
            "SELECT role AS label, COUNT(*) AS count FROM users GROUP BY role ORDER BY role",
        )
        .fetch_all(pool)
        .await?;

        let open_chats: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chats WHERE is_open = true")
                .fetch_one(pool)
                .await?;
        let pending_tasks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status <> 'completed'")
                .fetch_one(pool)
                .await?;
        let pending_leave_requests: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM leave_requests WHERE status = 'pending'")
                .fetch_one(pool)
                .await?;

        Ok(DashboardStats {
            bookings_by_status,
            users_by_role,
            open_chats,
            pending_tasks,
            pending_leave_requests,
        })
    }
}
