//! Cross-entity transition rules for bookings, chats and tasks.
//!
//! Every mutation site (status endpoint, chat close, message post, task
//! update, staff assignment/removal) asks these functions what should happen
//! next and applies the answer. The functions are pure so the rules live in
//! exactly one place.
//!
//! | trigger                               | effect                                   |
//! |---------------------------------------|------------------------------------------|
//! | booking set to `completed`            | close the chat if open                   |
//! | staff/admin reply, booking pending/confirmed | booking -> `in_progress`          |
//! | chat closed                           | booking -> `completed`                   |
//! | task updated, all tasks completed     | booking -> `completed` (once)            |
//! | staff assigned                        | one task per new staff id, maybe primary |
//! | staff removed                         | promote next assignee or clear primary   |

use std::collections::HashSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::is_service_side;
use crate::status::{BookingStatus, TaskStatus};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Booking status
// ---------------------------------------------------------------------------

/// A booking status change that should be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: BookingStatus,
    pub to: BookingStatus,
    /// The booking's chat is still open and must be closed with this change.
    pub close_chat: bool,
}

/// Plan an explicit status change.
///
/// Any status may follow any other; setting the current status again yields
/// `None` so callers skip notifications for no-op updates.
pub fn plan_status_change(
    current: BookingStatus,
    requested: BookingStatus,
    chat_open: bool,
) -> Option<StatusChange> {
    if current == requested {
        return None;
    }
    Some(StatusChange {
        from: current,
        to: requested,
        close_chat: requested == BookingStatus::Completed && chat_open,
    })
}

/// Status the booking should move to after a chat message is posted.
///
/// Only a staff/admin reply to a booking that has not started yet advances
/// it; once `in_progress` later replies change nothing.
pub fn status_after_reply(current: BookingStatus, sender_role: &str) -> Option<BookingStatus> {
    let not_started = matches!(current, BookingStatus::Pending | BookingStatus::Confirmed);
    if not_started && is_service_side(sender_role) {
        Some(BookingStatus::InProgress)
    } else {
        None
    }
}

/// Status the booking should move to after its chat is closed.
pub fn status_after_chat_closed(current: BookingStatus) -> Option<BookingStatus> {
    (current != BookingStatus::Completed).then_some(BookingStatus::Completed)
}

/// Whether a task update moved the task into `completed`.
///
/// Only this transition re-evaluates the booking; updates that leave the
/// status alone or reopen a task never complete it.
pub fn task_entered_completed(previous: TaskStatus, next: TaskStatus) -> bool {
    previous != TaskStatus::Completed && next == TaskStatus::Completed
}

/// Status the booking should move to after one of its tasks changed.
///
/// `task_statuses` holds the status of every task of the booking *after*
/// the update. A booking without tasks is never auto-completed.
pub fn status_after_task_update(
    current: BookingStatus,
    task_statuses: &[TaskStatus],
) -> Option<BookingStatus> {
    let all_done = !task_statuses.is_empty()
        && task_statuses.iter().all(|s| *s == TaskStatus::Completed);
    (all_done && current != BookingStatus::Completed).then_some(BookingStatus::Completed)
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Message shown when posting into a closed chat.
pub const CHAT_CLOSED_MESSAGE: &str = "Chat is closed. No new messages can be sent.";

/// Reject new messages once the chat is closed.
pub fn ensure_chat_accepts_messages(is_open: bool) -> Result<(), CoreError> {
    if is_open {
        Ok(())
    } else {
        Err(CoreError::DomainRule(CHAT_CLOSED_MESSAGE.into()))
    }
}

/// Closing is one-way; a second close is a rule violation.
pub fn ensure_chat_can_close(is_open: bool) -> Result<(), CoreError> {
    if is_open {
        Ok(())
    } else {
        Err(CoreError::DomainRule("Chat is already closed".into()))
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Compute the `completed_at` value after a task status update.
///
/// Set on entry to `completed`, preserved while it stays completed, cleared
/// for any other status.
pub fn completed_at_after(
    previous: TaskStatus,
    previous_completed_at: Option<Timestamp>,
    next: TaskStatus,
    now: Timestamp,
) -> Option<Timestamp> {
    match (previous, next) {
        (TaskStatus::Completed, TaskStatus::Completed) => previous_completed_at.or(Some(now)),
        (_, TaskStatus::Completed) => Some(now),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Staff assignment
// ---------------------------------------------------------------------------

/// Message returned when an assignment request names no staff.
pub const EMPTY_ASSIGNMENT_MESSAGE: &str = "At least one staff member must be selected";

/// What an assignment request will do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentPlan {
    /// Staff ids that need a new task, in request order.
    pub to_create: Vec<DbId>,
    /// Requested ids that already hold a task for the booking.
    pub already_assigned: Vec<DbId>,
    /// New primary staff id, when the booking has none yet.
    pub promote_primary: Option<DbId>,
}

/// Plan a staff assignment.
///
/// Duplicate ids in the request are collapsed; ids that already hold a task
/// are skipped rather than rejected.
pub fn plan_assignment(
    requested: &[DbId],
    current_assignees: &[DbId],
    current_primary: Option<DbId>,
) -> Result<AssignmentPlan, CoreError> {
    if requested.is_empty() {
        return Err(CoreError::Validation(EMPTY_ASSIGNMENT_MESSAGE.into()));
    }

    let existing: HashSet<DbId> = current_assignees.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut to_create = Vec::new();
    let mut already_assigned = Vec::new();

    for &staff_id in requested {
        if !seen.insert(staff_id) {
            continue;
        }
        if existing.contains(&staff_id) {
            already_assigned.push(staff_id);
        } else {
            to_create.push(staff_id);
        }
    }

    let promote_primary = match current_primary {
        Some(_) => None,
        None => to_create.first().copied(),
    };

    Ok(AssignmentPlan {
        to_create,
        already_assigned,
        promote_primary,
    })
}

/// How the primary staff reference changes after a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryUpdate {
    Keep,
    Promote(DbId),
    Clear,
}

/// Decide the primary staff reference after `removed` lost its task.
///
/// `remaining` lists the assignees left on the booking, oldest task first.
pub fn plan_staff_removal(
    removed: DbId,
    remaining: &[DbId],
    current_primary: Option<DbId>,
) -> PrimaryUpdate {
    if current_primary != Some(removed) {
        return PrimaryUpdate::Keep;
    }
    match remaining.iter().find(|&&id| id != removed) {
        Some(&next) => PrimaryUpdate::Promote(next),
        None => PrimaryUpdate::Clear,
    }
}
