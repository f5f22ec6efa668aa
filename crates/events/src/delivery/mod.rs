//! External delivery channels for notifications.
//!
//! Each channel implements [`NotificationChannel`]. Channels resolve their
//! configuration per send from the settings cache and report
//! [`SendOutcome::Skipped`] when they are not configured or the recipient
//! has no address for them.

pub mod email;
pub mod whatsapp;

use async_trait::async_trait;

use crate::notifier::{ExternalNotice, Recipient};

/// Result of a send attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Skipped(&'static str),
}

/// Error type for channel delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error(transparent)]
    Email(#[from] email::EmailError),

    #[error(transparent)]
    WhatsApp(#[from] whatsapp::WhatsAppError),
}

/// An outbound notification channel.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn send(
        &self,
        recipient: &Recipient,
        notice: &ExternalNotice,
    ) -> Result<SendOutcome, ChannelError>;
}
