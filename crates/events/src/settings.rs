//! Notification channel settings.
//!
//! Values live in `app_settings` under the `notifications.` prefix and fall
//! back to environment variables key by key. [`CachedSettingsProvider`]
//! keeps the resolved [`NotificationSettings`] for a TTL so every outbound
//! message does not hit the database; an admin update calls
//! [`invalidate`](CachedSettingsProvider::invalidate).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use servicedesk_db::repositories::SettingRepo;
use servicedesk_db::DbPool;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::delivery::email::{EmailConfig, DEFAULT_FROM_ADDRESS, DEFAULT_SMTP_PORT};
use crate::delivery::whatsapp::WhatsAppConfig;

/// Key prefix of every notification setting in `app_settings`.
pub const SETTINGS_PREFIX: &str = "notifications.";

pub const KEY_SMTP_HOST: &str = "notifications.smtp_host";
pub const KEY_SMTP_PORT: &str = "notifications.smtp_port";
pub const KEY_SMTP_FROM: &str = "notifications.smtp_from";
pub const KEY_SMTP_USER: &str = "notifications.smtp_user";
pub const KEY_SMTP_PASSWORD: &str = "notifications.smtp_password";
pub const KEY_WHATSAPP_API_URL: &str = "notifications.whatsapp_api_url";
pub const KEY_WHATSAPP_API_TOKEN: &str = "notifications.whatsapp_api_token";
pub const KEY_WHATSAPP_FROM: &str = "notifications.whatsapp_from";

/// Setting key and the environment variable it falls back to.
pub const SETTING_KEYS: &[(&str, &str)] = &[
    (KEY_SMTP_HOST, "SMTP_HOST"),
    (KEY_SMTP_PORT, "SMTP_PORT"),
    (KEY_SMTP_FROM, "SMTP_FROM"),
    (KEY_SMTP_USER, "SMTP_USER"),
    (KEY_SMTP_PASSWORD, "SMTP_PASSWORD"),
    (KEY_WHATSAPP_API_URL, "WHATSAPP_API_URL"),
    (KEY_WHATSAPP_API_TOKEN, "WHATSAPP_API_TOKEN"),
    (KEY_WHATSAPP_FROM, "WHATSAPP_FROM"),
];

/// Replacement shown instead of secret values.
pub const MASK: &str = "********";

/// Default cache lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// NotificationSettings
// ---------------------------------------------------------------------------

/// Resolved channel configuration. A `None` channel is not configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSettings {
    pub email: Option<EmailConfig>,
    pub whatsapp: Option<WhatsAppConfig>,
}

impl NotificationSettings {
    /// Build settings from stored values, consulting `env` for every key
    /// that is missing or blank.
    pub fn resolve<F>(stored: &HashMap<String, String>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| -> Option<String> {
            let from_db = stored
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            from_db.or_else(|| {
                SETTING_KEYS
                    .iter()
                    .find(|(k, _)| *k == key)
                    .and_then(|(_, var)| env(var))
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
        };

        let email = lookup(KEY_SMTP_HOST).map(|smtp_host| EmailConfig {
            smtp_host,
            smtp_port: lookup(KEY_SMTP_PORT)
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: lookup(KEY_SMTP_FROM)
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: lookup(KEY_SMTP_USER),
            smtp_password: lookup(KEY_SMTP_PASSWORD),
        });

        let whatsapp = match (lookup(KEY_WHATSAPP_API_URL), lookup(KEY_WHATSAPP_API_TOKEN)) {
            (Some(api_url), Some(api_token)) => Some(WhatsAppConfig {
                api_url,
                api_token,
                from: lookup(KEY_WHATSAPP_FROM),
            }),
            _ => None,
        };

        Self { email, whatsapp }
    }

    /// JSON view for the admin settings endpoint with secrets masked.
    pub fn masked_view(&self) -> serde_json::Value {
        let mask = |v: &Option<String>| v.as_ref().map(|_| MASK);
        serde_json::json!({
            "smtp": self.email.as_ref().map(|e| serde_json::json!({
                "host": e.smtp_host,
                "port": e.smtp_port,
                "from": e.from_address,
                "user": e.smtp_user,
                "password": mask(&e.smtp_password),
            })),
            "whatsapp": self.whatsapp.as_ref().map(|w| serde_json::json!({
                "api_url": w.api_url,
                "api_token": MASK,
                "from": w.from,
            })),
        })
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Error loading settings from their source.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings query failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Where notification settings come from.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn load(&self) -> Result<NotificationSettings, SettingsError>;
}

/// Reads `app_settings`, falling back to the process environment.
pub struct DbSettingsSource {
    pool: DbPool,
}

impl DbSettingsSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsSource for DbSettingsSource {
    async fn load(&self) -> Result<NotificationSettings, SettingsError> {
        let stored: HashMap<String, String> =
            SettingRepo::list_by_prefix(&self.pool, SETTINGS_PREFIX)
                .await?
                .into_iter()
                .map(|s| (s.key, s.value))
                .collect();
        Ok(NotificationSettings::resolve(&stored, |var| {
            std::env::var(var).ok()
        }))
    }
}

// ---------------------------------------------------------------------------
// CachedSettingsProvider
// ---------------------------------------------------------------------------

struct CachedEntry {
    loaded_at: Instant,
    settings: Arc<NotificationSettings>,
}

/// TTL cache in front of a [`SettingsSource`].
pub struct CachedSettingsProvider {
    source: Arc<dyn SettingsSource>,
    ttl: Duration,
    cached: RwLock<Option<CachedEntry>>,
}

impl CachedSettingsProvider {
    pub fn new(source: Arc<dyn SettingsSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Current settings, reloading from the source once the TTL expired.
    ///
    /// A failed reload keeps serving the previous value (or no channels at
    /// all when nothing was loaded yet).
    pub async fn current(&self) -> Arc<NotificationSettings> {
        if let Some(entry) = self.cached.read().await.as_ref() {
            if entry.loaded_at.elapsed() < self.ttl {
                return Arc::clone(&entry.settings);
            }
        }

        match self.source.load().await {
            Ok(settings) => {
                let settings = Arc::new(settings);
                *self.cached.write().await = Some(CachedEntry {
                    loaded_at: Instant::now(),
                    settings: Arc::clone(&settings),
                });
                settings
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load notification settings");
                self.cached
                    .read()
                    .await
                    .as_ref()
                    .map(|entry| Arc::clone(&entry.settings))
                    .unwrap_or_default()
            }
        }
    }

    /// Drop the cached value so the next read goes to the source.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}
