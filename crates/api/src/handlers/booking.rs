//! Handlers for the `/bookings` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use servicedesk_core::error::CoreError;
use servicedesk_core::export::{build_bookings_csv, BookingCsvRow};
use servicedesk_core::roles::{ROLE_CUSTOMER, ROLE_STAFF};
use servicedesk_core::status::BookingStatus;
use servicedesk_core::types::{DbId, Timestamp};
use servicedesk_db::models::booking::{AssignedStaff, BookingDetail, BookingScope};
use servicedesk_db::models::chat::Chat;
use servicedesk_db::models::task::Task;
use servicedesk_db::repositories::{BookingRepo, ChatRepo, TaskRepo};
use validator::Validate;

use crate::access::{find_booking, load_booking};
use crate::error::{AppError, AppResult};
use crate::lifecycle::{self, AssignmentResult, RemovalResult};
use crate::middleware::rbac::{RequireAdmin, RequireApproved};
use crate::query::StatusFilter;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /bookings`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub service_id: DbId,
    pub scheduled_date: Option<Timestamp>,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub notes: Option<String>,
}

/// Response of `POST /bookings`.
#[derive(Debug, Serialize)]
pub struct CreatedBooking {
    pub booking: servicedesk_db::models::booking::Booking,
    pub chat: Chat,
}

/// A booking with its chat and tasks.
#[derive(Debug, Serialize)]
pub struct BookingView {
    pub booking: BookingDetail,
    pub chat: Option<Chat>,
    pub tasks: Vec<Task>,
}

/// Request body for `PATCH /bookings/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Request body for `POST /bookings/{id}/assign`.
#[derive(Debug, Deserialize)]
pub struct AssignStaffRequest {
    #[serde(default)]
    pub staff_ids: Vec<DbId>,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/bookings
///
/// Book a service. Creates the booking and its chat.
pub async fn create_booking(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Json(input): Json<CreateBookingRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if auth.role != ROLE_CUSTOMER {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only customers can create bookings".into(),
        )));
    }

    let (booking, chat) = lifecycle::create_booking(
        &state,
        &auth,
        input.service_id,
        input.scheduled_date,
        input.notes,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedBooking { booking, chat },
        }),
    ))
}

/// GET /api/v1/bookings?status=
///
/// Customers see their own bookings, staff the bookings they are assigned
/// to, admins everything.
pub async fn list_bookings(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<DataResponse<Vec<BookingDetail>>>> {
    let status = match filter.status.as_deref() {
        Some(s) => Some(s.parse::<BookingStatus>().map_err(AppError::BadRequest)?),
        None => None,
    };

    let scope = match auth.role.as_str() {
        ROLE_CUSTOMER => BookingScope {
            customer_id: Some(auth.user_id),
            staff_id: None,
        },
        ROLE_STAFF => BookingScope {
            customer_id: None,
            staff_id: Some(auth.user_id),
        },
        _ => BookingScope::default(),
    };

    let bookings =
        BookingRepo::list_details(&state.pool, scope, status.map(BookingStatus::as_str)).await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// GET /api/v1/bookings/{id}
pub async fn get_booking(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BookingView>>> {
    load_booking(&state.pool, &auth, id).await?;

    let booking = BookingRepo::find_detail(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Booking",
            id,
        }))?;
    let chat = ChatRepo::find_by_booking(&state.pool, id).await?;
    let tasks = TaskRepo::list_for_booking(&state.pool, id).await?;

    Ok(Json(DataResponse {
        data: BookingView {
            booking,
            chat,
            tasks,
        },
    }))
}

/// PATCH /api/v1/bookings/{id}/status
///
/// Admins and assigned staff may set any status; the owning customer may
/// only cancel.
pub async fn update_status(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStatusRequest>,
) -> AppResult<Json<DataResponse<BookingDetail>>> {
    let requested: BookingStatus = input.status.parse().map_err(AppError::BadRequest)?;

    let booking = find_booking(&state.pool, id).await?;
    lifecycle::ensure_can_set_status(&state, &auth, &booking, requested).await?;

    let outcome = lifecycle::apply_booking_status(&state, id, requested, Some(auth.user_id)).await?;
    if !outcome.changed {
        tracing::debug!(booking_id = id, status = %requested, "Status unchanged");
    }

    Ok(Json(DataResponse {
        data: outcome.booking,
    }))
}

/// POST /api/v1/bookings/{id}/assign
pub async fn assign_staff(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AssignStaffRequest>,
) -> AppResult<Json<DataResponse<AssignmentResult>>> {
    let description = input.description.unwrap_or_default();
    let result =
        lifecycle::assign_staff(&state, &admin, id, &input.staff_ids, description.trim()).await?;
    Ok(Json(DataResponse { data: result }))
}

/// DELETE /api/v1/bookings/{id}/staff/{staff_id}
pub async fn remove_staff(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((id, staff_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<RemovalResult>>> {
    let result = lifecycle::remove_staff(&state, &admin, id, staff_id).await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/bookings/{id}/assigned-staff
pub async fn assigned_staff(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<AssignedStaff>>>> {
    load_booking(&state.pool, &auth, id).await?;
    let staff = BookingRepo::assigned_staff(&state.pool, id).await?;
    Ok(Json(DataResponse { data: staff }))
}

/// GET /api/v1/bookings/{id}/chat
pub async fn get_booking_chat(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Chat>>> {
    load_booking(&state.pool, &auth, id).await?;
    let chat = ChatRepo::find_by_booking(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Chat",
            id,
        }))?;
    Ok(Json(DataResponse { data: chat }))
}

/// GET /api/v1/bookings/export
///
/// Every booking as a CSV attachment.
pub async fn export_bookings(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let rows: Vec<BookingCsvRow> = BookingRepo::list_for_export(&state.pool)
        .await?
        .into_iter()
        .map(|r| BookingCsvRow {
            id: r.id,
            customer_name: r.customer_name,
            customer_email: r.customer_email,
            service_name: r.service_name,
            status: r.status,
            assigned_staff: r.assigned_staff,
            scheduled_date: r.scheduled_date,
            notes: r.notes,
            created_at: r.created_at,
        })
        .collect();

    tracing::info!(user_id = admin.user_id, rows = rows.len(), "Bookings exported");

    let csv = build_bookings_csv(&rows);
    Ok((
        [
            (axum::http::header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                axum::http::header::CONTENT_DISPOSITION,
                "attachment; filename=\"bookings.csv\"",
            ),
        ],
        csv,
    ))
}
