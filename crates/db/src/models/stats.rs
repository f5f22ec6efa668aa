//! Aggregates for the admin dashboard.

use serde::Serialize;
use sqlx::FromRow;

/// Row count grouped by a text column (status, role).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Dashboard figures returned by `GET /admin/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub bookings_by_status: Vec<LabelCount>,
    pub users_by_role: Vec<LabelCount>,
    pub open_chats: i64,
    pub pending_tasks: i64,
    pub pending_leave_requests: i64,
}
