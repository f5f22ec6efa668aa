//! Posting messages and closing chats.

use servicedesk_core::chat::{prepare_message, MessageDraft};
use servicedesk_core::error::CoreError;
use servicedesk_core::lifecycle::{
    ensure_chat_accepts_messages, ensure_chat_can_close, status_after_chat_closed,
    status_after_reply, CHAT_CLOSED_MESSAGE,
};
use servicedesk_core::notifications::KIND_MESSAGE;
use servicedesk_core::roles::{is_service_side, ROLE_STAFF};
use servicedesk_core::status::BookingStatus;
use servicedesk_core::types::DbId;
use servicedesk_db::models::chat::Chat;
use servicedesk_db::models::message::{CreateMessage, Message};
use servicedesk_db::repositories::{BookingRepo, ChatRepo, MessageRepo, TaskRepo, UserRepo};
use servicedesk_events::{templates, InAppNotice, Notice, RealtimeEvent, Topic};

use super::booking::{announce_chat_closed, apply_booking_status};
use super::{customer_recipient, parse_stored};
use crate::access::ChatContext;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Longest message preview placed in a notification.
const PREVIEW_CHARS: usize = 120;

/// Persist a message and fan it out.
///
/// Nothing is written when the chat is closed. A staff/admin reply to a
/// booking that has not started moves it to `in_progress`. Private messages
/// reach only staff, admins and their author.
pub async fn post_message(
    state: &AppState,
    ctx: &ChatContext,
    sender: &AuthUser,
    draft: MessageDraft,
) -> AppResult<Message> {
    ensure_chat_accepts_messages(ctx.chat.is_open)?;
    let draft = prepare_message(draft, &sender.role)?;

    let input = CreateMessage {
        chat_id: ctx.chat.id,
        sender_id: sender.user_id,
        content: draft.content,
        is_private: draft.is_private,
        is_quotation: draft.is_quotation,
        quotation_amount: draft.quotation_amount,
        attachment_url: draft.attachment_url,
        attachment_type: draft.attachment_type,
    };
    let message: Message = MessageRepo::create_if_open(&state.pool, &input)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::DomainRule(CHAT_CLOSED_MESSAGE.into())))?
        .into();

    tracing::info!(
        chat_id = ctx.chat.id,
        message_id = message.id,
        sender_id = sender.user_id,
        is_private = message.is_private,
        "Message posted"
    );

    let current: BookingStatus = parse_stored(&ctx.booking.status)?;
    if let Some(next) = status_after_reply(current, &sender.role) {
        apply_booking_status(state, ctx.booking.id, next, Some(sender.user_id)).await?;
    }

    publish_message(state, &message).await;
    if let Err(e) = notify_counterpart(state, ctx, &message).await {
        tracing::warn!(
            chat_id = ctx.chat.id,
            message_id = message.id,
            error = %e,
            "Failed to notify message recipients"
        );
    }

    Ok(message)
}

async fn publish_message(state: &AppState, message: &Message) {
    let topic = Topic::Chat(message.chat_id);
    let event = RealtimeEvent::NewMessage {
        chat_id: message.chat_id,
        message: message.clone(),
    };

    if message.is_private {
        let author = message.sender.id;
        state
            .hub
            .publish_where(topic, event, move |user_id, role| {
                is_service_side(role) || user_id == author
            })
            .await;
    } else {
        state.hub.publish(topic, event).await;
    }
}

async fn notify_counterpart(
    state: &AppState,
    ctx: &ChatContext,
    message: &Message,
) -> AppResult<()> {
    let booking_id = ctx.booking.id;
    let preview = preview(message);

    if is_service_side(&message.sender.role) {
        if message.is_private {
            return Ok(());
        }
        let Some(detail) = BookingRepo::find_detail(&state.pool, booking_id).await? else {
            return Ok(());
        };

        let in_app = InAppNotice::new(
            KIND_MESSAGE,
            format!("New message on booking #{booking_id}"),
            format!("{}: {preview}", message.sender.name),
        )
        .for_booking(booking_id);
        let mut notice = Notice::to(customer_recipient(&detail)).in_app(in_app);

        if let Some(amount) = message.quotation_amount.filter(|_| message.is_quotation) {
            notice = notice.external(templates::quotation(
                &detail.customer_name,
                booking_id,
                &detail.service_name,
                amount,
                &message.content,
            ));
        }
        state.notifier.notify(notice).await;
        return Ok(());
    }

    let mut staff_ids = TaskRepo::assignee_ids(&state.pool, booking_id).await?;
    if let Some(primary) = ctx.booking.assigned_staff_id {
        if !staff_ids.contains(&primary) {
            staff_ids.insert(0, primary);
        }
    }
    if staff_ids.is_empty() {
        return Ok(());
    }

    for staff in UserRepo::find_by_ids_with_role(&state.pool, &staff_ids, ROLE_STAFF).await? {
        let in_app = InAppNotice::new(
            KIND_MESSAGE,
            format!("New message on booking #{booking_id}"),
            format!("{}: {preview}", message.sender.name),
        )
        .for_booking(booking_id);
        state
            .notifier
            .notify(Notice::to(&staff).in_app(in_app))
            .await;
    }
    Ok(())
}

fn preview(message: &Message) -> String {
    if message.content.is_empty() {
        return "sent an attachment".to_string();
    }
    let mut text: String = message.content.chars().take(PREVIEW_CHARS).collect();
    if message.content.chars().count() > PREVIEW_CHARS {
        text.push_str("...");
    }
    text
}

/// Close a chat and complete its booking.
///
/// Only assigned staff and admins may close; the participant check has
/// already run when the context was loaded.
pub async fn close_chat(state: &AppState, ctx: &ChatContext, actor: &AuthUser) -> AppResult<Chat> {
    if !is_service_side(&actor.role) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only staff or admins can close a chat".into(),
        )));
    }
    ensure_chat_can_close(ctx.chat.is_open)?;

    let closed = ChatRepo::close(&state.pool, ctx.chat.id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::DomainRule("Chat is already closed".into())))?;
    announce_chat_closed(state, &closed, Some(actor.user_id)).await;

    complete_after_close(state, closed.booking_id, actor.user_id).await?;
    Ok(closed)
}

async fn complete_after_close(state: &AppState, booking_id: DbId, actor_id: DbId) -> AppResult<()> {
    let Some(booking) = BookingRepo::find_by_id(&state.pool, booking_id).await? else {
        return Ok(());
    };
    let current: BookingStatus = parse_stored(&booking.status)?;
    if let Some(next) = status_after_chat_closed(current) {
        apply_booking_status(state, booking_id, next, Some(actor_id)).await?;
    }
    Ok(())
}
