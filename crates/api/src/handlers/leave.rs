//! Handlers for leave requests (`/leave-requests`) and balances.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use servicedesk_core::error::CoreError;
use servicedesk_core::leave::{
    ensure_quota, ensure_reviewable, quota_consumed, requested_days, LeaveBalance,
};
use servicedesk_core::notifications::KIND_APPROVAL;
use servicedesk_core::status::{LeaveStatus, LeaveType};
use servicedesk_core::types::DbId;
use servicedesk_db::models::leave_request::{CreateLeaveRequest, LeaveRequest};
use servicedesk_db::models::user::User;
use servicedesk_db::repositories::{LeaveRequestRepo, ReviewOutcome, UserRepo};
use servicedesk_events::bus::LEAVE_REVIEWED;
use servicedesk_events::{InAppNotice, Notice, PlatformEvent};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireStaff};
use crate::query::StatusFilter;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /leave-requests`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLeaveRequestBody {
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(min = 1, max = 2000, message = "must not be empty"))]
    pub reason: String,
}

/// Request body for `PATCH /leave-requests/{id}`.
#[derive(Debug, Deserialize)]
pub struct ReviewLeaveRequest {
    pub status: String,
}

/// POST /api/v1/leave-requests
pub async fn create_leave_request(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<CreateLeaveRequestBody>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let leave_type: LeaveType = input.leave_type.parse().map_err(AppError::BadRequest)?;
    let days = requested_days(input.start_date, input.end_date)?;

    let user = load_user(&state, auth.user_id).await?;
    ensure_quota(leave_type, days, balance_of(&user))?;

    let create = CreateLeaveRequest {
        user_id: auth.user_id,
        leave_type: leave_type.as_str().to_string(),
        start_date: input.start_date,
        end_date: input.end_date,
        days,
        reason: input.reason.trim().to_string(),
    };
    let request = LeaveRequestRepo::create(&state.pool, &create).await?;

    tracing::info!(
        user_id = auth.user_id,
        leave_request_id = request.id,
        leave_type = %leave_type,
        days,
        "Leave requested"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/v1/leave-requests?status=
///
/// Own requests; admins see everyone's.
pub async fn list_leave_requests(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<DataResponse<Vec<LeaveRequest>>>> {
    let status = filter
        .status
        .as_deref()
        .map(|s| s.parse::<LeaveStatus>().map_err(AppError::BadRequest))
        .transpose()?;
    let user_id = (!auth.is_admin()).then_some(auth.user_id);

    let requests =
        LeaveRequestRepo::list(&state.pool, user_id, status.map(LeaveStatus::as_str)).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// PATCH /api/v1/leave-requests/{id}
///
/// Approve or reject a pending request. Approving annual leave consumes quota.
pub async fn review_leave_request(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReviewLeaveRequest>,
) -> AppResult<Json<DataResponse<LeaveRequest>>> {
    let decision: LeaveStatus = input.status.parse().map_err(AppError::BadRequest)?;

    let request = LeaveRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "LeaveRequest",
            id,
        }))?;
    let current: LeaveStatus = request.status.parse().map_err(AppError::InternalError)?;
    ensure_reviewable(current, decision)?;

    let leave_type: LeaveType = request
        .leave_type
        .parse()
        .map_err(AppError::InternalError)?;
    let requester = load_user(&state, request.user_id).await?;

    let quota_days = if decision == LeaveStatus::Approved {
        ensure_quota(leave_type, request.days, balance_of(&requester))?;
        quota_consumed(leave_type, request.days)
    } else {
        0
    };

    let reviewed = match LeaveRequestRepo::review(
        &state.pool,
        id,
        decision.as_str(),
        admin.user_id,
        quota_days,
    )
    .await?
    {
        ReviewOutcome::Reviewed(r) => r,
        ReviewOutcome::AlreadyReviewed => {
            return Err(AppError::Core(CoreError::DomainRule(
                "Leave request has already been reviewed".into(),
            )))
        }
        ReviewOutcome::InsufficientQuota => {
            return Err(AppError::Core(CoreError::DomainRule(
                "Insufficient leave balance".into(),
            )))
        }
    };

    tracing::info!(
        leave_request_id = id,
        decision = %decision,
        reviewer_id = admin.user_id,
        "Leave request reviewed"
    );

    state.event_bus.publish(
        PlatformEvent::new(LEAVE_REVIEWED)
            .with_source("leave_request", id)
            .with_actor(admin.user_id)
            .with_payload(serde_json::json!({
                "status": decision.as_str(),
                "days": reviewed.days,
                "quota_days": quota_days,
            })),
    );

    let notice = InAppNotice::new(
        KIND_APPROVAL,
        format!("Leave request {decision}"),
        format!(
            "Your {} leave from {} to {} was {decision}",
            reviewed.leave_type, reviewed.start_date, reviewed.end_date
        ),
    );
    state
        .notifier
        .notify(Notice::to(&requester).in_app(notice))
        .await;

    Ok(Json(DataResponse { data: reviewed }))
}

/// GET /api/v1/leave-balance
pub async fn leave_balance(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<LeaveBalance>>> {
    let user = load_user(&state, auth.user_id).await?;
    Ok(Json(DataResponse {
        data: balance_of(&user),
    }))
}

async fn load_user(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))
}

fn balance_of(user: &User) -> LeaveBalance {
    LeaveBalance::new(user.leave_quota_total, user.leave_quota_used)
}
