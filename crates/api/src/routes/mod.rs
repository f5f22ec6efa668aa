pub mod admin;
pub mod attendance;
pub mod auth;
pub mod booking;
pub mod chat;
pub mod health;
pub mod leave;
pub mod notification;
pub mod service;
pub mod task;
pub mod upload;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws?token=                                       WebSocket
///
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
/// /auth/me                                         current user
///
/// /admin/users                                     list (admin)
/// /admin/users/{id}/approval                       approve / revoke (PATCH)
/// /admin/users/bulk-delete                         transactional delete (POST)
/// /admin/notifications/broadcast                   broadcast (POST)
/// /admin/audit-logs                                audit trail (GET)
/// /admin/stats                                     dashboard figures (GET)
/// /admin/settings/notifications                    channel settings (GET, PUT)
///
/// /services                                        list, create
/// /services/{id}                                   get, update, delete
///
/// /bookings                                        list, create
/// /bookings/export                                 CSV export (admin)
/// /bookings/{id}                                   get
/// /bookings/{id}/status                            change status (PATCH)
/// /bookings/{id}/assign                            assign staff (POST, admin)
/// /bookings/{id}/staff/{staff_id}                  remove staff (DELETE, admin)
/// /bookings/{id}/assigned-staff                    assignees (GET)
/// /bookings/{id}/chat                              the booking's chat (GET)
///
/// /chats/{id}                                      get
/// /chats/{id}/messages                             list, post
/// /chats/{id}/close                                close (POST)
/// /chats/{id}/transcript                           text export (GET)
///
/// /tasks                                           list, create
/// /tasks/{id}                                      update (PATCH)
///
/// /notifications                                   list
/// /notifications/read-all                          mark all read (POST)
/// /notifications/unread-count                      unread count (GET)
/// /notifications/{id}/read                         mark read (POST)
///
/// /attendance                                      list
/// /attendance/clock-in                             clock in (POST)
/// /attendance/clock-out                            clock out (POST)
///
/// /leave-requests                                  list, create
/// /leave-requests/{id}                             review (PATCH, admin)
/// /leave-balance                                   own balance (GET)
///
/// /uploads                                         media upload (POST, multipart)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket endpoint.
        .route("/ws", get(ws::ws_handler))
        // Authentication routes (register, login, me).
        .nest("/auth", auth::router())
        // Admin routes (users, broadcast, audit, stats, settings).
        .nest("/admin", admin::router())
        // Service catalog.
        .nest("/services", service::router())
        // Booking lifecycle and staff assignment.
        .nest("/bookings", booking::router())
        // Booking chats.
        .nest("/chats", chat::router())
        // Per-staff tasks.
        .nest("/tasks", task::router())
        // In-app notifications.
        .nest("/notifications", notification::router())
        // Attendance and leave.
        .nest("/attendance", attendance::router())
        .nest("/leave-requests", leave::router())
        .merge(leave::balance_router())
        // Media uploads.
        .nest("/uploads", upload::router())
}
