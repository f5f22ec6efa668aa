use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use servicedesk_core::error::CoreError;
use servicedesk_core::types::DbId;
use servicedesk_events::{Delivery, RealtimeEvent, Topic};

use crate::access::load_chat_context;
use crate::auth::jwt::authenticate_token;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Query string carried by the upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// Client-to-server frames, `{"action": "join_chat", "chat_id": 7}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    JoinChat { chat_id: DbId },
    LeaveChat { chat_id: DbId },
}

/// GET /api/v1/ws?token=<jwt>
///
/// The token is validated before the upgrade, so a bad token is a plain 401
/// response and never a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsAuthQuery>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let token = query.token.filter(|t| !t.is_empty()).ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized("Missing token".into()))
    })?;

    let user = authenticate_token(&token, &state.config.jwt).map_err(|e| {
        tracing::debug!(error = %e, "WebSocket token rejected");
        AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
    })?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the hub (subscribed to its user topic).
///   2. Spawns a sender task that drains the hub channel into the sink.
///   3. Processes inbound commands on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = user.user_id, "WebSocket connected");

    let mut rx = state.hub.add(conn_id.clone(), user.user_id, user.role.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward hub deliveries to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(delivery) = rx.recv().await {
            let frame = match delivery {
                Delivery::Event(event) => match serde_json::to_string(&event) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize realtime event");
                        continue;
                    }
                },
                Delivery::Ping => Message::Ping(Vec::new().into()),
                Delivery::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };
            if sink.send(frame).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound commands.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                handle_command(&state, &conn_id, &user, text.as_str()).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    state.hub.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Apply one client command. Failures are reported back on the same
/// connection as an `error` event.
async fn handle_command(state: &AppState, conn_id: &str, user: &AuthUser, text: &str) {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(c) => c,
        Err(_) => {
            reply_error(state, conn_id, "Unrecognized message").await;
            return;
        }
    };

    match command {
        ClientCommand::JoinChat { chat_id } => {
            match load_chat_context(&state.pool, user, chat_id).await {
                Ok(_) => {
                    state.hub.subscribe(conn_id, Topic::Chat(chat_id)).await;
                    state
                        .hub
                        .send_to(conn_id, RealtimeEvent::JoinedChat { chat_id })
                        .await;
                    tracing::debug!(conn_id, chat_id, "Joined chat room");
                }
                Err(e) => {
                    let message = match e {
                        AppError::Core(CoreError::NotFound { .. }) => "Chat not found",
                        AppError::Core(CoreError::Forbidden(_)) => {
                            "You do not have access to this chat"
                        }
                        other => {
                            tracing::error!(error = %other, chat_id, "join_chat failed");
                            "Could not join chat"
                        }
                    };
                    reply_error(state, conn_id, message).await;
                }
            }
        }
        ClientCommand::LeaveChat { chat_id } => {
            state.hub.unsubscribe(conn_id, Topic::Chat(chat_id)).await;
        }
    }
}

async fn reply_error(state: &AppState, conn_id: &str, message: &str) {
    state
        .hub
        .send_to(
            conn_id,
            RealtimeEvent::Error {
                message: message.to_string(),
            },
        )
        .await;
}
