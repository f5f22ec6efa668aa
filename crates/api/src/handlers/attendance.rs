//! Handlers for staff attendance (`/attendance`).

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use servicedesk_core::attendance::{ensure_can_clock_in, worked_minutes};
use servicedesk_core::error::CoreError;
use servicedesk_core::types::DbId;
use servicedesk_db::models::attendance::AttendanceRecord;
use servicedesk_db::repositories::AttendanceRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /attendance/clock-in`.
#[derive(Debug, Default, Deserialize)]
pub struct ClockInRequest {
    pub notes: Option<String>,
}

/// Query parameters for `GET /attendance`.
#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    /// Admin only; other callers always see their own records.
    pub user_id: Option<DbId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// POST /api/v1/attendance/clock-in
pub async fn clock_in(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    // The body is optional.
    let input: ClockInRequest = if body.is_empty() {
        ClockInRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?
    };

    let open = AttendanceRepo::find_open(&state.pool, auth.user_id).await?;
    ensure_can_clock_in(open.is_some())?;

    let notes = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let record = AttendanceRepo::clock_in(&state.pool, auth.user_id, notes).await?;

    tracing::info!(user_id = auth.user_id, record_id = record.id, "Clocked in");

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// POST /api/v1/attendance/clock-out
pub async fn clock_out(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<AttendanceRecord>>> {
    let open = AttendanceRepo::find_open(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::DomainRule("Not clocked in".into())))?;

    let now = Utc::now();
    let minutes = worked_minutes(open.clock_in_at, now);
    let record = AttendanceRepo::clock_out(&state.pool, open.id, now, minutes)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::DomainRule("Not clocked in".into())))?;

    tracing::info!(user_id = auth.user_id, record_id = record.id, minutes, "Clocked out");

    Ok(Json(DataResponse { data: record }))
}

/// GET /api/v1/attendance?user_id=&from=&to=
pub async fn list_attendance(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Query(params): Query<AttendanceQuery>,
) -> AppResult<Json<DataResponse<Vec<AttendanceRecord>>>> {
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if to < from {
            return Err(AppError::BadRequest("'to' must not be before 'from'".into()));
        }
    }

    let user_id = if auth.is_admin() {
        params.user_id
    } else {
        Some(auth.user_id)
    };
    let records = AttendanceRepo::list(&state.pool, user_id, params.from, params.to).await?;
    Ok(Json(DataResponse { data: records }))
}
