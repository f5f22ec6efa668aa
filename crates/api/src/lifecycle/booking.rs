//! Booking creation and status changes.

use servicedesk_core::error::CoreError;
use servicedesk_core::lifecycle::plan_status_change;
use servicedesk_core::notifications::KIND_BOOKING;
use servicedesk_core::roles::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_STAFF};
use servicedesk_core::status::BookingStatus;
use servicedesk_core::types::DbId;
use servicedesk_db::models::booking::{Booking, BookingDetail, CreateBooking};
use servicedesk_db::models::chat::Chat;
use servicedesk_db::repositories::{BookingRepo, ChatRepo, ServiceRepo, UserRepo};
use servicedesk_events::bus::{BOOKING_CREATED, BOOKING_STATUS_CHANGED, CHAT_CLOSED};
use servicedesk_events::{templates, InAppNotice, Notice, PlatformEvent, RealtimeEvent, Topic};

use super::{customer_recipient, parse_stored, record};
use crate::access::find_booking;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Result of a status change request.
#[derive(Debug)]
pub struct StatusOutcome {
    pub booking: BookingDetail,
    /// `false` when the booking already had the requested status.
    pub changed: bool,
}

/// Create a booking and its chat for `customer`, then notify admins and
/// send the customer a confirmation.
pub async fn create_booking(
    state: &AppState,
    customer: &AuthUser,
    service_id: DbId,
    scheduled_date: Option<servicedesk_core::types::Timestamp>,
    notes: Option<String>,
) -> AppResult<(Booking, Chat)> {
    let service = ServiceRepo::find_by_id(&state.pool, service_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Service",
            id: service_id,
        }))?;
    if !service.is_active {
        return Err(AppError::BadRequest(
            "Service is not available for booking".into(),
        ));
    }

    let input = CreateBooking {
        customer_id: customer.user_id,
        service_id,
        scheduled_date,
        notes: notes.filter(|n| !n.trim().is_empty()),
    };
    let (booking, chat) = BookingRepo::create_with_chat(&state.pool, &input).await?;

    tracing::info!(
        booking_id = booking.id,
        chat_id = chat.id,
        customer_id = customer.user_id,
        "Booking created"
    );

    record(
        state,
        PlatformEvent::new(BOOKING_CREATED)
            .with_source("booking", booking.id)
            .with_payload(serde_json::json!({
                "service_id": service.id,
                "chat_id": chat.id,
            })),
        Some(customer.user_id),
    );

    if let Err(e) = notify_new_booking(state, &booking, &service.name).await {
        tracing::warn!(booking_id = booking.id, error = %e, "Failed to send booking notifications");
    }

    Ok((booking, chat))
}

/// Tell every admin about a new booking and send the customer a confirmation.
async fn notify_new_booking(
    state: &AppState,
    booking: &Booking,
    service_name: &str,
) -> AppResult<()> {
    let customer = UserRepo::find_by_id(&state.pool, booking.customer_id).await?;
    let customer_name = customer.as_ref().map(|u| u.name.clone()).unwrap_or_default();

    for admin in UserRepo::list(&state.pool, Some(ROLE_ADMIN)).await? {
        let notice = InAppNotice::new(
            KIND_BOOKING,
            "New booking",
            format!("{customer_name} booked {service_name} (booking #{})", booking.id),
        )
        .for_booking(booking.id);
        state.notifier.notify(Notice::to(&admin).in_app(notice)).await;
    }

    if let Some(customer) = customer {
        let confirmation = templates::booking_confirmation(
            &customer.name,
            booking.id,
            service_name,
            booking.scheduled_date,
        );
        state
            .notifier
            .notify(Notice::to(&customer).external(confirmation))
            .await;
    }
    Ok(())
}

/// Check whether `user` may set `requested` on `booking`.
///
/// Admins and assigned staff may set any status; the owning customer may
/// only cancel.
pub async fn ensure_can_set_status(
    state: &AppState,
    user: &AuthUser,
    booking: &Booking,
    requested: BookingStatus,
) -> AppResult<()> {
    let allowed = match user.role.as_str() {
        ROLE_ADMIN => true,
        ROLE_STAFF => BookingRepo::is_assigned(&state.pool, booking.id, user.user_id).await?,
        ROLE_CUSTOMER => {
            if booking.customer_id != user.user_id {
                false
            } else if requested != BookingStatus::Cancelled {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Customers can only cancel their bookings".into(),
                )));
            } else {
                true
            }
        }
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this booking".into(),
        )))
    }
}

/// Move a booking to `requested`.
///
/// A no-op when the status is unchanged. Completing a booking closes its
/// chat if still open. The customer is told about every real change.
pub async fn apply_booking_status(
    state: &AppState,
    booking_id: DbId,
    requested: BookingStatus,
    actor_id: Option<DbId>,
) -> AppResult<StatusOutcome> {
    let booking = find_booking(&state.pool, booking_id).await?;
    let current: BookingStatus = parse_stored(&booking.status)?;
    let chat = ChatRepo::find_by_booking(&state.pool, booking_id).await?;
    let chat_open = chat.as_ref().is_some_and(|c| c.is_open);

    let Some(change) = plan_status_change(current, requested, chat_open) else {
        let detail = load_detail(state, booking_id).await?;
        return Ok(StatusOutcome {
            booking: detail,
            changed: false,
        });
    };

    let written = BookingRepo::update_status(&state.pool, booking_id, change.to.as_str()).await?;
    if written.is_none() {
        // A concurrent request already applied this status.
        let detail = load_detail(state, booking_id).await?;
        return Ok(StatusOutcome {
            booking: detail,
            changed: false,
        });
    }

    tracing::info!(
        booking_id,
        from = %change.from,
        to = %change.to,
        "Booking status changed"
    );

    record(
        state,
        PlatformEvent::new(BOOKING_STATUS_CHANGED)
            .with_source("booking", booking_id)
            .with_payload(serde_json::json!({
                "from": change.from.as_str(),
                "to": change.to.as_str(),
            })),
        actor_id,
    );

    if change.close_chat {
        if let Some(chat) = chat {
            if let Some(closed) = ChatRepo::close(&state.pool, chat.id).await? {
                announce_chat_closed(state, &closed, actor_id).await;
            }
        }
    }

    let detail = load_detail(state, booking_id).await?;
    notify_status_change(state, &detail).await;

    Ok(StatusOutcome {
        booking: detail,
        changed: true,
    })
}

/// Broadcast `chat_closed` to the chat topic and record the audit event.
pub(crate) async fn announce_chat_closed(state: &AppState, chat: &Chat, actor_id: Option<DbId>) {
    let delivered = state
        .hub
        .publish(
            Topic::Chat(chat.id),
            RealtimeEvent::ChatClosed {
                chat_id: chat.id,
                booking_id: chat.booking_id,
                closed_at: chat.closed_at,
            },
        )
        .await;

    tracing::info!(
        chat_id = chat.id,
        booking_id = chat.booking_id,
        delivered,
        "Chat closed"
    );

    record(
        state,
        PlatformEvent::new(CHAT_CLOSED)
            .with_source("chat", chat.id)
            .with_payload(serde_json::json!({ "booking_id": chat.booking_id })),
        actor_id,
    );
}

async fn load_detail(state: &AppState, booking_id: DbId) -> AppResult<BookingDetail> {
    BookingRepo::find_detail(&state.pool, booking_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Booking",
            id: booking_id,
        }))
}

async fn notify_status_change(state: &AppState, detail: &BookingDetail) {
    let in_app = InAppNotice::new(
        KIND_BOOKING,
        "Booking status updated",
        format!(
            "Your booking #{} ({}) is now {}",
            detail.id, detail.service_name, detail.status
        ),
    )
    .for_booking(detail.id);
    let external = templates::status_update(
        &detail.customer_name,
        detail.id,
        &detail.service_name,
        &detail.status,
    );

    state
        .notifier
        .notify(
            Notice::to(customer_recipient(detail))
                .in_app(in_app)
                .external(external),
        )
        .await;
}
