//! Staff assignment, removal and task progress.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use servicedesk_core::error::CoreError;
use servicedesk_core::lifecycle::{
    completed_at_after, plan_assignment, plan_staff_removal, status_after_task_update,
    task_entered_completed, PrimaryUpdate,
};
use servicedesk_core::notifications::{KIND_BOOKING, KIND_TASK};
use servicedesk_core::roles::ROLE_STAFF;
use servicedesk_core::status::{BookingStatus, TaskStatus};
use servicedesk_core::types::DbId;
use servicedesk_db::models::task::Task;
use servicedesk_db::models::user::User;
use servicedesk_db::repositories::{BookingRepo, TaskRepo, UserRepo};
use servicedesk_events::bus::{BOOKING_STAFF_ASSIGNED, BOOKING_STAFF_REMOVED, TASK_STATUS_CHANGED};
use servicedesk_events::{templates, InAppNotice, Notice, PlatformEvent};

use super::booking::apply_booking_status;
use super::{customer_recipient, parse_stored, record};
use crate::access::find_booking;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Response of an assignment request.
#[derive(Debug, Serialize)]
pub struct AssignmentResult {
    /// Tasks created by this request.
    pub created: Vec<Task>,
    /// Requested staff ids that already held a task.
    pub already_assigned: Vec<DbId>,
    /// Primary assignee after the request.
    pub primary_staff_id: Option<DbId>,
}

/// Response of a staff removal.
#[derive(Debug, Serialize)]
pub struct RemovalResult {
    pub booking_id: DbId,
    pub removed_staff_id: DbId,
    pub tasks_removed: u64,
    /// Primary assignee after the removal.
    pub primary_staff_id: Option<DbId>,
}

/// Assign staff to a booking, one task per newly assigned staff member.
///
/// Ids that already hold a task are reported rather than rejected. The
/// first newly assigned id becomes primary when the booking has none.
pub async fn assign_staff(
    state: &AppState,
    actor: &AuthUser,
    booking_id: DbId,
    requested: &[DbId],
    description: &str,
) -> AppResult<AssignmentResult> {
    let booking = find_booking(&state.pool, booking_id).await?;
    let current = TaskRepo::assignee_ids(&state.pool, booking_id).await?;
    let plan = plan_assignment(requested, &current, booking.assigned_staff_id)?;

    let staff: HashMap<DbId, User> = if plan.to_create.is_empty() {
        HashMap::new()
    } else {
        UserRepo::find_by_ids_with_role(&state.pool, &plan.to_create, ROLE_STAFF)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };
    if let Some(invalid) = plan.to_create.iter().find(|id| !staff.contains_key(*id)) {
        return Err(AppError::BadRequest(format!(
            "User {invalid} is not a staff member"
        )));
    }

    let mut created = Vec::with_capacity(plan.to_create.len());
    let mut already_assigned = plan.already_assigned.clone();
    for &staff_id in &plan.to_create {
        match TaskRepo::create_for_staff(&state.pool, booking_id, staff_id, description).await? {
            Some(task) => created.push(task),
            // Lost a race with a concurrent assignment of the same staff member.
            None => already_assigned.push(staff_id),
        }
    }

    let promoted = plan.promote_primary.and_then(|planned| {
        if created.iter().any(|t| t.staff_id == planned) {
            Some(planned)
        } else {
            created.first().map(|t| t.staff_id)
        }
    });
    if let Some(primary) = promoted {
        BookingRepo::set_primary_staff(&state.pool, booking_id, Some(primary)).await?;
    }
    let primary_staff_id = promoted.or(booking.assigned_staff_id);

    tracing::info!(
        booking_id,
        created = created.len(),
        already_assigned = already_assigned.len(),
        primary_staff_id,
        "Staff assigned"
    );

    if !created.is_empty() {
        record(
            state,
            PlatformEvent::new(BOOKING_STAFF_ASSIGNED)
                .with_source("booking", booking_id)
                .with_payload(serde_json::json!({
                    "staff_ids": created.iter().map(|t| t.staff_id).collect::<Vec<_>>(),
                    "primary_staff_id": primary_staff_id,
                })),
            Some(actor.user_id),
        );
        if let Err(e) = notify_assignment(state, booking_id, &created, &staff, description).await
        {
            tracing::warn!(booking_id, error = %e, "Failed to notify assigned staff");
        }
    }

    Ok(AssignmentResult {
        created,
        already_assigned,
        primary_staff_id,
    })
}

async fn notify_assignment(
    state: &AppState,
    booking_id: DbId,
    created: &[Task],
    staff: &HashMap<DbId, User>,
    description: &str,
) -> AppResult<()> {
    let Some(detail) = BookingRepo::find_detail(&state.pool, booking_id).await? else {
        return Ok(());
    };

    let mut names = Vec::with_capacity(created.len());
    for task in created {
        let Some(user) = staff.get(&task.staff_id) else {
            continue;
        };
        names.push(user.name.clone());

        let in_app = InAppNotice::new(
            KIND_TASK,
            "New task assigned",
            format!(
                "You have been assigned to booking #{booking_id} ({}) for {}",
                detail.service_name, detail.customer_name
            ),
        )
        .for_booking(booking_id);
        let external = templates::staff_assignment(
            &user.name,
            booking_id,
            &detail.service_name,
            &detail.customer_name,
            description,
        );
        state
            .notifier
            .notify(Notice::to(user).in_app(in_app).external(external))
            .await;
    }

    let summary = InAppNotice::new(
        KIND_BOOKING,
        "Staff assigned",
        format!(
            "{} assigned to your booking #{booking_id} ({})",
            names.join(", "),
            detail.service_name
        ),
    )
    .for_booking(booking_id);
    state
        .notifier
        .notify(Notice::to(customer_recipient(&detail)).in_app(summary))
        .await;
    Ok(())
}

/// Remove a staff member from a booking.
///
/// Deletes their task and, when they were primary, promotes the earliest
/// remaining assignee or clears the reference.
pub async fn remove_staff(
    state: &AppState,
    actor: &AuthUser,
    booking_id: DbId,
    staff_id: DbId,
) -> AppResult<RemovalResult> {
    let booking = find_booking(&state.pool, booking_id).await?;

    let tasks_removed =
        TaskRepo::delete_by_booking_and_staff(&state.pool, booking_id, staff_id).await?;
    if tasks_removed == 0 && booking.assigned_staff_id != Some(staff_id) {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Staff assignment",
            id: staff_id,
        }));
    }

    let remaining = TaskRepo::assignee_ids(&state.pool, booking_id).await?;
    let primary_staff_id = match plan_staff_removal(staff_id, &remaining, booking.assigned_staff_id)
    {
        PrimaryUpdate::Keep => booking.assigned_staff_id,
        PrimaryUpdate::Promote(next) => {
            BookingRepo::set_primary_staff(&state.pool, booking_id, Some(next)).await?;
            Some(next)
        }
        PrimaryUpdate::Clear => {
            BookingRepo::set_primary_staff(&state.pool, booking_id, None).await?;
            None
        }
    };

    tracing::info!(booking_id, staff_id, tasks_removed, primary_staff_id, "Staff removed");

    record(
        state,
        PlatformEvent::new(BOOKING_STAFF_REMOVED)
            .with_source("booking", booking_id)
            .with_payload(serde_json::json!({
                "staff_id": staff_id,
                "primary_staff_id": primary_staff_id,
            })),
        Some(actor.user_id),
    );

    match UserRepo::find_by_id(&state.pool, staff_id).await {
        Ok(Some(user)) => {
            let in_app = InAppNotice::new(
                KIND_TASK,
                "Removed from booking",
                format!("You are no longer assigned to booking #{booking_id}"),
            )
            .for_booking(booking_id);
            state
                .notifier
                .notify(Notice::to(&user).in_app(in_app))
                .await;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(booking_id, staff_id, error = %e, "Failed to notify removed staff member");
        }
    }

    Ok(RemovalResult {
        booking_id,
        removed_staff_id: staff_id,
        tasks_removed,
        primary_staff_id,
    })
}

/// Update a task's status and attachments, then re-evaluate its booking.
///
/// When every task of the booking is completed the booking completes, which
/// closes its chat and notifies the customer.
pub async fn update_task(
    state: &AppState,
    actor: &AuthUser,
    task_id: DbId,
    status: Option<TaskStatus>,
    attachments: Option<Vec<String>>,
) -> AppResult<Task> {
    let task = TaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        }))?;

    if !actor.is_admin() && task.staff_id != actor.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the assigned staff member or an admin can update this task".into(),
        )));
    }

    let previous: TaskStatus = parse_stored(&task.status)?;
    let next = status.unwrap_or(previous);
    let completed_at = completed_at_after(previous, task.completed_at, next, Utc::now());
    let attachments = attachments.map(|urls| serde_json::json!(urls));

    let updated = TaskRepo::update_progress(
        &state.pool,
        task_id,
        next.as_str(),
        completed_at,
        attachments.as_ref(),
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "Task",
        id: task_id,
    }))?;

    if previous != next {
        tracing::info!(task_id, booking_id = task.booking_id, from = %previous, to = %next, "Task status changed");
        record(
            state,
            PlatformEvent::new(TASK_STATUS_CHANGED)
                .with_source("task", task_id)
                .with_payload(serde_json::json!({
                    "booking_id": task.booking_id,
                    "from": previous.as_str(),
                    "to": next.as_str(),
                })),
            Some(actor.user_id),
        );
    }

    if task_entered_completed(previous, next) {
        let statuses = TaskRepo::statuses_for_booking(&state.pool, task.booking_id)
            .await?
            .iter()
            .map(|s| parse_stored::<TaskStatus>(s))
            .collect::<AppResult<Vec<_>>>()?;
        let booking = find_booking(&state.pool, task.booking_id).await?;
        let current: BookingStatus = parse_stored(&booking.status)?;
        if let Some(next_booking) = status_after_task_update(current, &statuses) {
            apply_booking_status(state, booking.id, next_booking, Some(actor.user_id)).await?;
        }
    }

    Ok(updated)
}
