//! WhatsApp notification delivery over an HTTP messaging API.
//!
//! [`WhatsAppChannel`] POSTs a JSON text message with a bearer token to the
//! configured endpoint. One attempt per notification; failures are reported
//! to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::delivery::{ChannelError, NotificationChannel, SendOutcome};
use crate::notifier::{ExternalNotice, Recipient};
use crate::settings::CachedSettingsProvider;

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for WhatsApp delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote API returned a non-2xx status code.
    #[error("WhatsApp API returned HTTP {0}")]
    HttpStatus(u16),
}

/// Messaging API settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub api_token: String,
    /// Sender number, when the API requires one.
    pub from: Option<String>,
}

/// Delivers notifications as WhatsApp text messages.
pub struct WhatsAppChannel {
    client: reqwest::Client,
    settings: Arc<CachedSettingsProvider>,
}

impl WhatsAppChannel {
    pub fn new(settings: Arc<CachedSettingsProvider>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { client, settings }
    }

    /// Request body sent to the messaging API.
    pub fn payload(config: &WhatsAppConfig, to_phone: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "from": config.from,
            "to": to_phone,
            "type": "text",
            "text": { "body": text },
        })
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(
        &self,
        config: &WhatsAppConfig,
        payload: &serde_json::Value,
    ) -> Result<(), WhatsAppError> {
        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(&config.api_token)
            .json(payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WhatsAppError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(
        &self,
        recipient: &Recipient,
        notice: &ExternalNotice,
    ) -> Result<SendOutcome, ChannelError> {
        let settings = self.settings.current().await;
        let Some(config) = settings.whatsapp.as_ref() else {
            return Ok(SendOutcome::Skipped("WhatsApp is not configured"));
        };
        let Some(phone) = recipient.phone.as_deref().filter(|p| !p.trim().is_empty()) else {
            return Ok(SendOutcome::Skipped("recipient has no phone number"));
        };

        let text = format!("{}\n\n{}", notice.subject, notice.body);
        self.try_send(config, &Self::payload(config, phone, &text))
            .await?;
        tracing::info!(to = phone, "WhatsApp notification sent");
        Ok(SendOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatsapp_error_display_http_status() {
        let err = WhatsAppError::HttpStatus(502);
        assert_eq!(err.to_string(), "WhatsApp API returned HTTP 502");
    }

    #[test]
    fn payload_carries_recipient_and_text() {
        let config = WhatsAppConfig {
            api_url: "https://wa.example.com/messages".into(),
            api_token: "t".into(),
            from: Some("+15550000".into()),
        };
        let body = WhatsAppChannel::payload(&config, "+15551234", "Booking confirmed");
        assert_eq!(body["to"], "+15551234");
        assert_eq!(body["from"], "+15550000");
        assert_eq!(body["text"]["body"], "Booking confirmed");
    }
}
