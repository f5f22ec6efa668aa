//! Admin-only handlers: user management, broadcasts, audit log, dashboard
//! statistics and notification channel settings.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use servicedesk_core::error::CoreError;
use servicedesk_core::notifications::{KIND_APPROVAL, KIND_BROADCAST};
use servicedesk_core::roles::validate_role;
use servicedesk_core::types::DbId;
use servicedesk_db::models::audit::{AuditLog, AuditQuery};
use servicedesk_db::models::stats::DashboardStats;
use servicedesk_db::models::user::UserResponse;
use servicedesk_db::repositories::{AuditLogRepo, SettingRepo, StatsRepo, UserRepo};
use servicedesk_events::bus::{USERS_BULK_DELETED, USER_APPROVED};
use servicedesk_events::settings::{
    KEY_SMTP_FROM, KEY_SMTP_HOST, KEY_SMTP_PASSWORD, KEY_SMTP_PORT, KEY_SMTP_USER,
    KEY_WHATSAPP_API_TOKEN, KEY_WHATSAPP_API_URL, KEY_WHATSAPP_FROM, MASK,
};
use servicedesk_events::{InAppNotice, Notice, PlatformEvent};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /admin/users`.
#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

/// Request body for `PATCH /admin/users/{id}/approval`.
#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
}

/// Request body for `POST /admin/users/bulk-delete`.
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub user_ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

/// Request body for `POST /admin/notifications/broadcast`.
#[derive(Debug, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "must not be empty"))]
    pub message: String,
    /// Limit the broadcast to one role.
    pub role: Option<String>,
    /// Links to files attached to the announcement.
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BroadcastResponse {
    pub recipients: usize,
}

/// Request body for `PUT /admin/settings/notifications`.
///
/// Absent fields are left unchanged; an empty string clears a value (the
/// environment fallback applies again); the mask placeholder is ignored so
/// clients can send back what they read.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationSettingsUpdate {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub whatsapp_api_url: Option<String>,
    pub whatsapp_api_token: Option<String>,
    pub whatsapp_from: Option<String>,
}

impl NotificationSettingsUpdate {
    fn entries(self) -> Vec<(String, String)> {
        [
            (KEY_SMTP_HOST, self.smtp_host),
            (KEY_SMTP_PORT, self.smtp_port),
            (KEY_SMTP_FROM, self.smtp_from),
            (KEY_SMTP_USER, self.smtp_user),
            (KEY_SMTP_PASSWORD, self.smtp_password),
            (KEY_WHATSAPP_API_URL, self.whatsapp_api_url),
            (KEY_WHATSAPP_API_TOKEN, self.whatsapp_api_token),
            (KEY_WHATSAPP_FROM, self.whatsapp_from),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .filter(|v| v != MASK)
                .map(|v| (key.to_string(), v.trim().to_string()))
        })
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users?role=
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<UserListQuery>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    if let Some(role) = params.role.as_deref() {
        validate_role(role).map_err(AppError::BadRequest)?;
    }
    let users = UserRepo::list(&state.pool, params.role.as_deref())
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(DataResponse { data: users }))
}

/// PATCH /api/v1/admin/users/{id}/approval
pub async fn set_approval(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ApprovalRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::set_approval(&state.pool, id, input.approved)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    tracing::info!(user_id = id, approved = input.approved, admin_id = admin.user_id, "User approval changed");

    state.event_bus.publish(
        PlatformEvent::new(USER_APPROVED)
            .with_source("user", id)
            .with_actor(admin.user_id)
            .with_payload(serde_json::json!({ "approved": input.approved })),
    );

    let (title, message) = if input.approved {
        ("Account approved", "Your account has been approved. You can now use the service desk.")
    } else {
        ("Account approval revoked", "Your account is pending approval again.")
    };
    state
        .notifier
        .notify(Notice::to(&user).in_app(InAppNotice::new(KIND_APPROVAL, title, message)))
        .await;

    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// POST /api/v1/admin/users/bulk-delete
///
/// Delete users and everything they own in one transaction.
pub async fn bulk_delete_users(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<BulkDeleteRequest>,
) -> AppResult<Json<DataResponse<BulkDeleteResponse>>> {
    if input.user_ids.is_empty() {
        return Err(AppError::BadRequest("user_ids must not be empty".into()));
    }
    if input.user_ids.contains(&admin.user_id) {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".into(),
        ));
    }

    let deleted = UserRepo::bulk_delete(&state.pool, &input.user_ids).await?;

    tracing::info!(deleted, admin_id = admin.user_id, "Users bulk deleted");
    state.event_bus.publish(
        PlatformEvent::new(USERS_BULK_DELETED)
            .with_actor(admin.user_id)
            .with_payload(serde_json::json!({
                "user_ids": input.user_ids,
                "deleted": deleted,
            })),
    );

    Ok(Json(DataResponse {
        data: BulkDeleteResponse { deleted },
    }))
}

// ---------------------------------------------------------------------------
// Broadcast
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/notifications/broadcast
pub async fn broadcast(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<BroadcastRequest>,
) -> AppResult<Json<DataResponse<BroadcastResponse>>> {
    input.validate()?;
    if let Some(role) = input.role.as_deref() {
        validate_role(role).map_err(AppError::BadRequest)?;
    }

    let attachments: Vec<String> = input
        .attachments
        .iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();

    let users = UserRepo::list(&state.pool, input.role.as_deref()).await?;
    for user in &users {
        let notice = InAppNotice::new(KIND_BROADCAST, input.title.trim(), input.message.trim())
            .with_attachments(attachments.clone());
        state.notifier.notify(Notice::to(user).in_app(notice)).await;
    }

    tracing::info!(recipients = users.len(), role = ?input.role, admin_id = admin.user_id, "Broadcast sent");

    Ok(Json(DataResponse {
        data: BroadcastResponse {
            recipients: users.len(),
        },
    }))
}

// ---------------------------------------------------------------------------
// Audit log & stats
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/audit-logs?limit=&offset=&action=
pub async fn list_audit_logs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<DataResponse<Vec<AuditLog>>>> {
    let logs = AuditLogRepo::query(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: logs }))
}

/// GET /api/v1/admin/stats
pub async fn stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DashboardStats>>> {
    let stats = StatsRepo::dashboard(&state.pool).await?;
    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// Notification settings
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/settings/notifications
///
/// Effective channel settings with secrets masked.
pub async fn get_notification_settings(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    let settings = state.settings.current().await;
    Ok(Json(DataResponse {
        data: settings.masked_view(),
    }))
}

/// PUT /api/v1/admin/settings/notifications
///
/// Store new values and drop the cached settings so the next notification
/// uses them.
pub async fn update_notification_settings(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<NotificationSettingsUpdate>,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    let entries = input.entries();
    if let Some((_, port)) = entries.iter().find(|(k, _)| k == KEY_SMTP_PORT) {
        if !port.is_empty() && port.parse::<u16>().is_err() {
            return Err(AppError::BadRequest("smtp_port must be a valid port number".into()));
        }
    }

    SettingRepo::upsert_many(&state.pool, &entries).await?;
    state.settings.invalidate().await;

    tracing::info!(keys = entries.len(), admin_id = admin.user_id, "Notification settings updated");

    let settings = state.settings.current().await;
    Ok(Json(DataResponse {
        data: settings.masked_view(),
    }))
}
