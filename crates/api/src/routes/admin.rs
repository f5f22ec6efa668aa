//! Route definitions for `/admin`. Every endpoint requires the admin role.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /users                       -> list_users
/// PATCH  /users/{id}/approval         -> set_approval
/// POST   /users/bulk-delete           -> bulk_delete_users
/// POST   /notifications/broadcast     -> broadcast
/// GET    /audit-logs                  -> list_audit_logs
/// GET    /stats                       -> stats
/// GET    /settings/notifications      -> get_notification_settings
/// PUT    /settings/notifications      -> update_notification_settings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}/approval", patch(admin::set_approval))
        .route("/users/bulk-delete", post(admin::bulk_delete_users))
        .route("/notifications/broadcast", post(admin::broadcast))
        .route("/audit-logs", get(admin::list_audit_logs))
        .route("/stats", get(admin::stats))
        .route(
            "/settings/notifications",
            get(admin::get_notification_settings).put(admin::update_notification_settings),
        )
}
