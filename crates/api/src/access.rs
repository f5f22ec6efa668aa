//! Participant checks shared by booking, chat and WebSocket handlers.
//!
//! A booking (and its chat) is visible to its owning customer, to staff who
//! hold a task on it or are its primary assignee, and to every admin.

use servicedesk_core::error::CoreError;
use servicedesk_core::roles::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_STAFF};
use servicedesk_core::types::DbId;
use servicedesk_db::models::booking::Booking;
use servicedesk_db::models::chat::Chat;
use servicedesk_db::repositories::{BookingRepo, ChatRepo};
use servicedesk_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Whether `user_id` (with `role`) may see `booking`.
pub async fn can_access_booking(
    pool: &DbPool,
    user_id: DbId,
    role: &str,
    booking: &Booking,
) -> Result<bool, sqlx::Error> {
    match role {
        ROLE_ADMIN => Ok(true),
        ROLE_CUSTOMER => Ok(booking.customer_id == user_id),
        ROLE_STAFF => BookingRepo::is_assigned(pool, booking.id, user_id).await,
        _ => Ok(false),
    }
}

/// Reject with 403 unless the user participates in the booking.
pub async fn ensure_booking_access(
    pool: &DbPool,
    user: &AuthUser,
    booking: &Booking,
) -> AppResult<()> {
    if can_access_booking(pool, user.user_id, &user.role, booking).await? {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this booking".into(),
        )))
    }
}

/// Load a booking or fail with 404.
pub async fn find_booking(pool: &DbPool, id: DbId) -> AppResult<Booking> {
    BookingRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Booking",
            id,
        }))
}

/// Load a booking the user participates in.
pub async fn load_booking(pool: &DbPool, user: &AuthUser, id: DbId) -> AppResult<Booking> {
    let booking = find_booking(pool, id).await?;
    ensure_booking_access(pool, user, &booking).await?;
    Ok(booking)
}

/// A chat together with the booking that owns it.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub chat: Chat,
    pub booking: Booking,
}

/// Load a chat and its booking, enforcing the participant check.
pub async fn load_chat_context(
    pool: &DbPool,
    user: &AuthUser,
    chat_id: DbId,
) -> AppResult<ChatContext> {
    let chat = ChatRepo::find_by_id(pool, chat_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Chat",
            id: chat_id,
        }))?;
    let booking = load_booking(pool, user, chat.booking_id).await?;
    Ok(ChatContext { chat, booking })
}
