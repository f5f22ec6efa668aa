//! Forwarding of uploaded files to the third-party media store.
//!
//! The store accepts a multipart POST (`file`, plus `upload_preset` and
//! `api_key` when configured) and answers with JSON carrying the public URL
//! in `secure_url` or `url`.

use std::time::Duration;

/// HTTP timeout for one upload.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Default upload size limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Media storage settings.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Upload endpoint. Uploads are refused while unset.
    pub upload_url: Option<String>,
    pub upload_preset: Option<String>,
    pub api_key: Option<String>,
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_url: None,
            upload_preset: None,
            api_key: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl MediaConfig {
    /// Load media settings from environment variables.
    ///
    /// | Env Var               | Default    |
    /// |-----------------------|------------|
    /// | `MEDIA_UPLOAD_URL`    | unset      |
    /// | `MEDIA_UPLOAD_PRESET` | unset      |
    /// | `MEDIA_API_KEY`       | unset      |
    /// | `MAX_UPLOAD_BYTES`    | `10485760` |
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        Self {
            upload_url: non_empty("MEDIA_UPLOAD_URL"),
            upload_preset: non_empty("MEDIA_UPLOAD_PRESET"),
            api_key: non_empty("MEDIA_API_KEY"),
            max_upload_bytes,
        }
    }
}

/// Error type for media upload failures.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media storage is not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Media storage returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Media storage response did not contain a URL")]
    MissingUrl,
}

/// Uploads files to the configured media store.
pub struct MediaClient {
    client: reqwest::Client,
    config: MediaConfig,
}

impl MediaClient {
    pub fn new(config: MediaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.upload_url.is_some()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    /// Upload one file and return its public URL.
    pub async fn upload(
        &self,
        file_name: String,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, MediaError> {
        let url = self
            .config
            .upload_url
            .as_deref()
            .ok_or(MediaError::NotConfigured)?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)?;
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(preset) = &self.config.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }
        if let Some(key) = &self.config.api_key {
            form = form.text("api_key", key.clone());
        }

        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response.json().await?;
        extract_url(&json).ok_or(MediaError::MissingUrl)
    }
}

/// Pick the public URL out of the store's response.
fn extract_url(json: &serde_json::Value) -> Option<String> {
    ["secure_url", "url"]
        .iter()
        .find_map(|key| json.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_url_preferred() {
        let json = serde_json::json!({
            "url": "http://cdn.example.com/a.png",
            "secure_url": "https://cdn.example.com/a.png",
        });
        assert_eq!(
            extract_url(&json).as_deref(),
            Some("https://cdn.example.com/a.png")
        );
    }

    #[test]
    fn missing_url_is_none() {
        assert_eq!(extract_url(&serde_json::json!({"id": 1})), None);
    }

    #[tokio::test]
    async fn unconfigured_upload_is_refused() {
        let client = MediaClient::new(MediaConfig::default());
        assert!(!client.is_configured());
        let err = client
            .upload("a.txt".into(), "text/plain", b"hi".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NotConfigured));
    }
}
