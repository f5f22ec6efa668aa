//! Orchestration of the booking / chat / task lifecycle.
//!
//! These functions are the only writers of booking status, chat closure and
//! task status. Each one asks `servicedesk_core::lifecycle` what should
//! happen, persists the answer, then fans out real-time events, audit events
//! and notifications. Handlers call them instead of touching the
//! repositories directly.

pub mod booking;
pub mod chat;
pub mod task;

use std::str::FromStr;

use servicedesk_core::types::DbId;
use servicedesk_db::models::booking::BookingDetail;
use servicedesk_events::{PlatformEvent, Recipient};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub use booking::{apply_booking_status, create_booking, ensure_can_set_status, StatusOutcome};
pub use chat::{close_chat, post_message};
pub use task::{assign_staff, remove_staff, update_task, AssignmentResult, RemovalResult};

/// Parse a status column read back from the database.
///
/// The table's `CHECK` constraint keeps these valid, so a failure means the
/// schema and the enum drifted apart.
pub(crate) fn parse_stored<T>(value: &str) -> AppResult<T>
where
    T: FromStr<Err = String>,
{
    value.parse().map_err(AppError::InternalError)
}

/// The customer of a booking as a notification recipient.
pub(crate) fn customer_recipient(detail: &BookingDetail) -> Recipient {
    Recipient {
        id: detail.customer_id,
        name: detail.customer_name.clone(),
        email: detail.customer_email.clone(),
        phone: detail.customer_phone.clone(),
    }
}

/// Publish an audit event, attributing it to `actor_id` when known.
pub(crate) fn record(state: &AppState, event: PlatformEvent, actor_id: Option<DbId>) {
    let event = match actor_id {
        Some(id) => event.with_actor(id),
        None => event,
    };
    state.event_bus.publish(event);
}
