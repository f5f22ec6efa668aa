//! Topic-based real-time fan-out.
//!
//! [`RealtimeHub`] tracks live client connections and the topics each one
//! follows. It knows nothing about the socket transport: every connection is
//! an unbounded channel of [`Delivery`] values that the transport drains.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use servicedesk_core::types::{DbId, Timestamp};
use servicedesk_db::models::message::Message;
use servicedesk_db::models::notification::Notification;
use tokio::sync::{mpsc, RwLock};

/// A subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every participant following a chat.
    Chat(DbId),
    /// Every connection of one user.
    User(DbId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Chat(id) => write!(f, "chat:{id}"),
            Topic::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// Server-to-client event, serialized as `{"type": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    NewMessage {
        chat_id: DbId,
        message: Message,
    },
    ChatClosed {
        chat_id: DbId,
        booking_id: DbId,
        closed_at: Option<Timestamp>,
    },
    Notification {
        notification: Notification,
    },
    JoinedChat {
        chat_id: DbId,
    },
    Error {
        message: String,
    },
}

/// What the transport should send on a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Event(RealtimeEvent),
    Ping,
    Close,
}

/// Channel sender half for pushing deliveries to a connection.
pub type DeliverySender = mpsc::UnboundedSender<Delivery>;

/// Metadata for a single live connection.
struct Subscriber {
    user_id: DbId,
    role: String,
    sender: DeliverySender,
    topics: HashSet<Topic>,
}

/// Manages all live connections and their topic subscriptions.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` and shared across the
/// application.
pub struct RealtimeHub {
    connections: RwLock<HashMap<String, Subscriber>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register an authenticated connection, subscribed to its user topic.
    ///
    /// Returns the receiver half the transport forwards to the client.
    pub async fn add(
        &self,
        conn_id: String,
        user_id: DbId,
        role: impl Into<String>,
    ) -> mpsc::UnboundedReceiver<Delivery> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber {
            user_id,
            role: role.into(),
            sender: tx,
            topics: HashSet::from([Topic::User(user_id)]),
        };
        self.connections.write().await.insert(conn_id, subscriber);
        rx
    }

    /// Remove a connection and all of its subscriptions.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Subscribe a connection to a topic. Returns `false` for unknown connections.
    pub async fn subscribe(&self, conn_id: &str, topic: Topic) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(sub) => {
                sub.topics.insert(topic);
                true
            }
            None => false,
        }
    }

    /// Drop a topic subscription. Returns `true` if it existed.
    pub async fn unsubscribe(&self, conn_id: &str, topic: Topic) -> bool {
        self.connections
            .write()
            .await
            .get_mut(conn_id)
            .is_some_and(|sub| sub.topics.remove(&topic))
    }

    /// Send an event to every subscriber of `topic`.
    ///
    /// Returns the number of connections the event was queued for.
    pub async fn publish(&self, topic: Topic, event: RealtimeEvent) -> usize {
        self.publish_where(topic, event, |_, _| true).await
    }

    /// Send an event to the subscribers of `topic` accepted by `filter`,
    /// which receives each subscriber's user id and role.
    ///
    /// Connections whose channel is closed are skipped; they are removed when
    /// their transport loop ends.
    pub async fn publish_where<F>(&self, topic: Topic, event: RealtimeEvent, filter: F) -> usize
    where
        F: Fn(DbId, &str) -> bool,
    {
        let conns = self.connections.read().await;
        let mut count = 0;
        for sub in conns.values() {
            if sub.topics.contains(&topic)
                && filter(sub.user_id, &sub.role)
                && sub.sender.send(Delivery::Event(event.clone())).is_ok()
            {
                count += 1;
            }
        }
        count
    }

    /// Send an event to a single connection.
    pub async fn send_to(&self, conn_id: &str, event: RealtimeEvent) -> bool {
        self.connections
            .read()
            .await
            .get(conn_id)
            .is_some_and(|sub| sub.sender.send(Delivery::Event(event)).is_ok())
    }

    /// Return the current number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Queue a ping on every connection.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for sub in conns.values() {
            let _ = sub.sender.send(Delivery::Ping);
        }
    }

    /// Queue a close on every connection, then forget them all.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for sub in conns.values() {
            let _ = sub.sender.send(Delivery::Close);
        }
        conns.clear();
        tracing::info!(count, "Closed all real-time connections");
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn joined(chat_id: DbId) -> RealtimeEvent {
        RealtimeEvent::JoinedChat { chat_id }
    }

    #[tokio::test]
    async fn user_topic_is_subscribed_on_connect() {
        let hub = RealtimeHub::new();
        let mut rx = hub.add("c1".into(), 5, "customer").await;

        assert_eq!(hub.publish(Topic::User(5), joined(1)).await, 1);
        assert_eq!(hub.publish(Topic::User(6), joined(1)).await, 0);
        assert_matches!(rx.recv().await, Some(Delivery::Event(RealtimeEvent::JoinedChat { chat_id: 1 })));
    }

    #[tokio::test]
    async fn chat_topic_requires_subscription() {
        let hub = RealtimeHub::new();
        let mut rx = hub.add("c1".into(), 5, "staff").await;

        assert_eq!(hub.publish(Topic::Chat(9), joined(9)).await, 0);
        assert!(hub.subscribe("c1", Topic::Chat(9)).await);
        assert_eq!(hub.publish(Topic::Chat(9), joined(9)).await, 1);
        assert_matches!(rx.recv().await, Some(Delivery::Event(_)));

        assert!(hub.unsubscribe("c1", Topic::Chat(9)).await);
        assert_eq!(hub.publish(Topic::Chat(9), joined(9)).await, 0);
    }

    #[tokio::test]
    async fn filtered_publish_skips_rejected_subscribers() {
        let hub = RealtimeHub::new();
        let mut customer = hub.add("cust".into(), 1, "customer").await;
        let mut staff = hub.add("staff".into(), 2, "staff").await;
        hub.subscribe("cust", Topic::Chat(3)).await;
        hub.subscribe("staff", Topic::Chat(3)).await;

        let sent = hub
            .publish_where(Topic::Chat(3), joined(3), |_, role| role != "customer")
            .await;
        assert_eq!(sent, 1);
        assert!(staff.try_recv().is_ok());
        assert!(customer.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscribe_unknown_connection_fails() {
        let hub = RealtimeHub::new();
        assert!(!hub.subscribe("missing", Topic::Chat(1)).await);
        assert!(!hub.send_to("missing", joined(1)).await);
    }

    #[tokio::test]
    async fn shutdown_sends_close_and_clears() {
        let hub = RealtimeHub::new();
        let mut rx = hub.add("c1".into(), 1, "admin").await;
        hub.shutdown_all().await;

        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(rx.recv().await, Some(Delivery::Close));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(RealtimeEvent::Error {
            message: "Not a participant".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "Not a participant");
        assert_eq!(Topic::Chat(4).to_string(), "chat:4");
    }
}
