use crate::auth::jwt::JwtConfig;
use crate::media::MediaConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the JWT
/// secret. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Approve self-registered customers immediately (default: `true`).
    pub auto_approve_customers: bool,
    /// Third-party media storage used by `POST /uploads`.
    pub media: MediaConfig,
    /// Lifetime of the cached notification channel settings (default: `60`).
    pub notification_settings_ttl_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                    |
    /// |----------------------------------|----------------------------|
    /// | `HOST`                           | `0.0.0.0`                  |
    /// | `PORT`                           | `3000`                     |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                       |
    /// | `AUTO_APPROVE_CUSTOMERS`         | `true`                     |
    /// | `NOTIFICATION_SETTINGS_TTL_SECS` | `60`                       |
    ///
    /// JWT and media variables are documented on [`JwtConfig::from_env`] and
    /// [`MediaConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let auto_approve_customers = std::env::var("AUTO_APPROVE_CUSTOMERS")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        let notification_settings_ttl_secs: u64 = std::env::var("NOTIFICATION_SETTINGS_TTL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("NOTIFICATION_SETTINGS_TTL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            auto_approve_customers,
            media: MediaConfig::from_env(),
            notification_settings_ttl_secs,
        }
    }
}
