//! Handlers for the `/tasks` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use servicedesk_core::status::TaskStatus;
use servicedesk_core::types::DbId;
use servicedesk_db::models::task::{Task, TaskDetail};
use servicedesk_db::repositories::TaskRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::lifecycle;
use crate::middleware::rbac::{RequireAdmin, RequireStaff};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /tasks`.
#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    pub booking_id: Option<DbId>,
    pub status: Option<String>,
}

/// Request body for `POST /tasks`. Accepts either `staff_ids` or a single
/// `staff_id`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub booking_id: DbId,
    #[serde(default)]
    pub staff_ids: Vec<DbId>,
    pub staff_id: Option<DbId>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: String,
}

/// Request body for `PATCH /tasks/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub status: Option<String>,
    pub attachments: Option<Vec<String>>,
}

/// GET /api/v1/tasks?booking_id=&status=
///
/// Staff see their own tasks; admins see all.
pub async fn list_tasks(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Query(params): Query<TaskListParams>,
) -> AppResult<Json<DataResponse<Vec<TaskDetail>>>> {
    let status = parse_status(params.status.as_deref())?;
    let staff_id = (!auth.is_admin()).then_some(auth.user_id);

    let tasks = TaskRepo::list_details(
        &state.pool,
        staff_id,
        params.booking_id,
        status.map(TaskStatus::as_str),
    )
    .await?;
    Ok(Json(DataResponse { data: tasks }))
}

/// POST /api/v1/tasks
///
/// Assign staff to a booking with a task description.
pub async fn create_task(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTaskRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let mut staff_ids = input.staff_ids;
    if let Some(id) = input.staff_id {
        staff_ids.push(id);
    }

    let result = lifecycle::assign_staff(
        &state,
        &admin,
        input.booking_id,
        &staff_ids,
        input.description.trim(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}

/// PATCH /api/v1/tasks/{id}
///
/// Update status and/or attachments. The task's staff member or an admin.
pub async fn update_task(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTaskRequest>,
) -> AppResult<Json<DataResponse<Task>>> {
    let status = parse_status(input.status.as_deref())?;
    let task = lifecycle::update_task(&state, &auth, id, status, input.attachments).await?;
    Ok(Json(DataResponse { data: task }))
}

fn parse_status(value: Option<&str>) -> AppResult<Option<TaskStatus>> {
    value
        .map(|s| s.parse::<TaskStatus>().map_err(AppError::BadRequest))
        .transpose()
}
