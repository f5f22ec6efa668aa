//! Email notification delivery via SMTP.
//!
//! [`EmailChannel`] wraps the `lettre` async SMTP transport (STARTTLS) to
//! send plain-text notification emails. The SMTP configuration is read from
//! the settings cache on every send.

use std::sync::Arc;

use async_trait::async_trait;

use crate::delivery::{ChannelError, NotificationChannel, SendOutcome};
use crate::notifier::{ExternalNotice, Recipient};
use crate::settings::CachedSettingsProvider;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when none is configured.
pub const DEFAULT_FROM_ADDRESS: &str = "noreply@servicedesk.local";

/// SMTP settings for the email channel.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

// ---------------------------------------------------------------------------
// EmailChannel
// ---------------------------------------------------------------------------

/// Sends notification emails via SMTP.
pub struct EmailChannel {
    settings: Arc<CachedSettingsProvider>,
}

impl EmailChannel {
    pub fn new(settings: Arc<CachedSettingsProvider>) -> Self {
        Self { settings }
    }

    /// Send one plain-text email.
    pub async fn deliver(
        config: &EmailConfig,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = to_email, subject, "Notification email sent");
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(
        &self,
        recipient: &Recipient,
        notice: &ExternalNotice,
    ) -> Result<SendOutcome, ChannelError> {
        let settings = self.settings.current().await;
        let Some(config) = settings.email.as_ref() else {
            return Ok(SendOutcome::Skipped("SMTP is not configured"));
        };
        if recipient.email.trim().is_empty() {
            return Ok(SendOutcome::Skipped("recipient has no email address"));
        }

        Self::deliver(config, &recipient.email, &notice.subject, &notice.body).await?;
        Ok(SendOutcome::Sent)
    }
}
