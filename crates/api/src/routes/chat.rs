//! Route definitions for `/chats`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::chat;
use crate::state::AppState;

/// Routes mounted at `/chats`.
///
/// ```text
/// GET    /{id}                      -> get_chat
/// GET    /{id}/messages             -> list_messages
/// POST   /{id}/messages             -> post_message
/// POST   /{id}/close                -> close_chat
/// GET    /{id}/transcript           -> transcript (text/plain)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(chat::get_chat))
        .route(
            "/{id}/messages",
            get(chat::list_messages).post(chat::post_message),
        )
        .route("/{id}/close", post(chat::close_chat))
        .route("/{id}/transcript", get(chat::transcript))
}
