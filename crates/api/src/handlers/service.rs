//! Handlers for the `/services` catalog.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use servicedesk_core::error::CoreError;
use servicedesk_core::types::DbId;
use servicedesk_db::models::service::{CreateService, Service, UpdateService};
use servicedesk_db::repositories::ServiceRepo;
use servicedesk_events::bus::SERVICE_DELETED;
use servicedesk_events::PlatformEvent;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /services`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: f64,
    #[validate(range(min = 1, message = "must be positive"))]
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

/// Request body for `PUT /services/{id}`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: Option<f64>,
    #[validate(range(min = 1, message = "must be positive"))]
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

/// GET /api/v1/services
///
/// Active services for everyone; admins may add `?include_inactive=true`.
pub async fn list_services(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Service>>>> {
    let include_inactive = params.include_inactive && auth.is_admin();
    let services = ServiceRepo::list(&state.pool, include_inactive).await?;
    Ok(Json(DataResponse { data: services }))
}

/// GET /api/v1/services/{id}
pub async fn get_service(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Service>>> {
    let service = ServiceRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|s| s.is_active || auth.is_admin())
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Service",
            id,
        }))?;
    Ok(Json(DataResponse { data: service }))
}

/// POST /api/v1/services
pub async fn create_service(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateServiceRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let create = CreateService {
        name: input.name.trim().to_string(),
        description: input.description,
        price: input.price,
        duration_minutes: input.duration_minutes,
        is_active: input.is_active,
    };
    let service = ServiceRepo::create(&state.pool, &create).await?;

    tracing::info!(service_id = service.id, user_id = admin.user_id, "Service created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: service })))
}

/// PUT /api/v1/services/{id}
pub async fn update_service(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateServiceRequest>,
) -> AppResult<Json<DataResponse<Service>>> {
    input.validate()?;

    let update = UpdateService {
        name: input.name.map(|n| n.trim().to_string()),
        description: input.description,
        price: input.price,
        duration_minutes: input.duration_minutes,
        is_active: input.is_active,
    };
    let service = ServiceRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Service",
            id,
        }))?;

    tracing::info!(service_id = id, user_id = admin.user_id, "Service updated");

    Ok(Json(DataResponse { data: service }))
}

/// DELETE /api/v1/services/{id}
///
/// Removes the service together with its bookings, chats, messages and tasks.
pub async fn delete_service(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ServiceRepo::delete_cascade(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Service",
            id,
        }));
    }

    tracing::info!(service_id = id, user_id = admin.user_id, "Service deleted");
    state.event_bus.publish(
        PlatformEvent::new(SERVICE_DELETED)
            .with_source("service", id)
            .with_actor(admin.user_id),
    );

    Ok(StatusCode::NO_CONTENT)
}
