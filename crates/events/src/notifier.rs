//! Notification port.
//!
//! [`Notifier::notify`] is the single entry point for telling a user about
//! something. It never fails: the in-app part is stored and pushed inline
//! with errors logged, the external part is handed to a spawned task that
//! tries every [`NotificationChannel`] in turn.

use std::sync::Arc;

use servicedesk_core::types::DbId;
use servicedesk_db::models::notification::CreateNotification;
use servicedesk_db::models::user::User;
use servicedesk_db::repositories::NotificationRepo;
use servicedesk_db::DbPool;

use crate::delivery::{NotificationChannel, SendOutcome};
use crate::realtime::{RealtimeEvent, RealtimeHub, Topic};

/// Who a notice is for, with the addresses external channels need.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<&User> for Recipient {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
        }
    }
}

/// The in-app part of a notice: a `notifications` row plus a live push.
#[derive(Debug, Clone, PartialEq)]
pub struct InAppNotice {
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub booking_id: Option<DbId>,
    pub attachments: Vec<String>,
}

impl InAppNotice {
    pub fn new(kind: &'static str, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            booking_id: None,
            attachments: Vec::new(),
        }
    }

    pub fn for_booking(mut self, booking_id: DbId) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// The external part of a notice, rendered once for every channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalNotice {
    pub subject: String,
    pub body: String,
}

/// Something to tell one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub recipient: Recipient,
    pub in_app: Option<InAppNotice>,
    pub external: Option<ExternalNotice>,
}

impl Notice {
    pub fn to(recipient: impl Into<Recipient>) -> Self {
        Self {
            recipient: recipient.into(),
            in_app: None,
            external: None,
        }
    }

    pub fn in_app(mut self, notice: InAppNotice) -> Self {
        self.in_app = Some(notice);
        self
    }

    pub fn external(mut self, notice: ExternalNotice) -> Self {
        self.external = Some(notice);
        self
    }
}

/// Never-fail notification dispatcher.
#[derive(Clone)]
pub struct Notifier {
    pool: DbPool,
    hub: Arc<RealtimeHub>,
    channels: Arc<Vec<Arc<dyn NotificationChannel>>>,
}

impl Notifier {
    pub fn new(
        pool: DbPool,
        hub: Arc<RealtimeHub>,
        channels: Vec<Arc<dyn NotificationChannel>>,
    ) -> Self {
        Self {
            pool,
            hub,
            channels: Arc::new(channels),
        }
    }

    /// Deliver a notice. Failures are logged and swallowed.
    pub async fn notify(&self, notice: Notice) {
        let Notice {
            recipient,
            in_app,
            external,
        } = notice;

        if let Some(in_app) = in_app {
            self.store_and_push(recipient.id, in_app).await;
        }

        if let Some(external) = external {
            if self.channels.is_empty() {
                return;
            }
            let channels = Arc::clone(&self.channels);
            tokio::spawn(async move {
                dispatch_external(&channels, &recipient, &external).await;
            });
        }
    }

    async fn store_and_push(&self, user_id: DbId, notice: InAppNotice) {
        let input = CreateNotification {
            user_id,
            kind: notice.kind.to_string(),
            title: notice.title,
            message: notice.message,
            booking_id: notice.booking_id,
            attachments: notice.attachments,
        };

        match NotificationRepo::create(&self.pool, &input).await {
            Ok(notification) => {
                self.hub
                    .publish(
                        Topic::User(user_id),
                        RealtimeEvent::Notification { notification },
                    )
                    .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id, kind = notice.kind, "Failed to store notification");
            }
        }
    }
}

/// Try every channel in order. Returns how many channels sent the notice.
pub async fn dispatch_external(
    channels: &[Arc<dyn NotificationChannel>],
    recipient: &Recipient,
    notice: &ExternalNotice,
) -> usize {
    let mut sent = 0;
    for channel in channels {
        match channel.send(recipient, notice).await {
            Ok(SendOutcome::Sent) => sent += 1,
            Ok(SendOutcome::Skipped(reason)) => {
                tracing::debug!(channel = channel.name(), user_id = recipient.id, reason, "Channel skipped");
            }
            Err(e) => {
                tracing::warn!(
                    channel = channel.name(),
                    user_id = recipient.id,
                    error = %e,
                    "External notification failed"
                );
            }
        }
    }
    sent
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::delivery::whatsapp::WhatsAppError;
    use crate::delivery::ChannelError;

    struct Recording {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationChannel for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(
            &self,
            recipient: &Recipient,
            notice: &ExternalNotice,
        ) -> Result<SendOutcome, ChannelError> {
            self.sent
                .lock()
                .unwrap()
                .push(format!("{}:{}", recipient.email, notice.subject));
            Ok(SendOutcome::Sent)
        }
    }

    struct Failing;

    #[async_trait]
    impl NotificationChannel for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn send(&self, _: &Recipient, _: &ExternalNotice) -> Result<SendOutcome, ChannelError> {
            Err(WhatsAppError::HttpStatus(503).into())
        }
    }

    struct Unconfigured;

    #[async_trait]
    impl NotificationChannel for Unconfigured {
        fn name(&self) -> &'static str {
            "unconfigured"
        }

        async fn send(&self, _: &Recipient, _: &ExternalNotice) -> Result<SendOutcome, ChannelError> {
            Ok(SendOutcome::Skipped("not configured"))
        }
    }

    fn recipient() -> Recipient {
        Recipient {
            id: 1,
            name: "Jane".into(),
            email: "jane@example.com".into(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_stop_the_rest() {
        let recording = Arc::new(Recording {
            sent: Mutex::new(Vec::new()),
        });
        let channels: Vec<Arc<dyn NotificationChannel>> =
            vec![Arc::new(Failing), Arc::new(Unconfigured), recording.clone()];
        let notice = ExternalNotice {
            subject: "Booking confirmed".into(),
            body: "Thanks".into(),
        };

        let sent = dispatch_external(&channels, &recipient(), &notice).await;

        assert_eq!(sent, 1);
        assert_eq!(
            *recording.sent.lock().unwrap(),
            vec!["jane@example.com:Booking confirmed".to_string()]
        );
    }

    #[test]
    fn notice_builder_sets_parts() {
        let notice = Notice::to(recipient())
            .in_app(InAppNotice::new("booking", "New booking", "Booking #3").for_booking(3));
        assert_eq!(notice.in_app.as_ref().unwrap().booking_id, Some(3));
        assert!(notice.external.is_none());
    }
}
