#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use servicedesk_api::auth::jwt::{issue_access_token, JwtConfig};
use servicedesk_api::auth::password::hash_password;
use servicedesk_api::config::ServerConfig;
use servicedesk_api::media::{MediaClient, MediaConfig};
use servicedesk_api::router::build_app_router;
use servicedesk_api::state::AppState;
use servicedesk_core::roles::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_STAFF};
use servicedesk_core::types::DbId;
use servicedesk_db::models::service::{CreateService, Service};
use servicedesk_db::models::user::{CreateUser, User};
use servicedesk_db::repositories::{ServiceRepo, UserRepo};
use servicedesk_events::delivery::SendOutcome;
use servicedesk_events::{
    CachedSettingsProvider, ChannelError, DbSettingsSource, EventBus, ExternalNotice,
    NotificationChannel, Notifier, RealtimeHub, Recipient,
};

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Build a test `ServerConfig` with safe defaults.
///
/// Media storage is left unconfigured and no external channel is wired up,
/// so tests never leave the process.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        auto_approve_customers: true,
        media: MediaConfig::default(),
        notification_settings_ttl_secs: 60,
    }
}

/// Application state over `pool`, shared with the router built from it.
pub fn test_state(pool: PgPool) -> AppState {
    test_state_with_channels(pool, Vec::new())
}

/// Application state whose notifier delivers through `channels`.
pub fn test_state_with_channels(
    pool: PgPool,
    channels: Vec<Arc<dyn NotificationChannel>>,
) -> AppState {
    let config = test_config();
    let hub = Arc::new(RealtimeHub::new());
    let settings = Arc::new(CachedSettingsProvider::new(
        Arc::new(DbSettingsSource::new(pool.clone())),
        Duration::from_secs(config.notification_settings_ttl_secs),
    ));

    AppState {
        notifier: Notifier::new(pool.clone(), Arc::clone(&hub), channels),
        pool,
        media: Arc::new(MediaClient::new(config.media.clone())),
        config: Arc::new(config),
        hub,
        event_bus: Arc::new(EventBus::default()),
        settings,
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_router(test_state(pool), &test_config())
}

/// Build the router over an existing state, so tests can inspect its hub or
/// channels afterwards.
pub fn build_test_app_with_state(state: AppState) -> Router {
    build_app_router(state, &test_config())
}

// ---------------------------------------------------------------------------
// External channel capture
// ---------------------------------------------------------------------------

/// Channel that records every external notice instead of sending it.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(DbId, String)>>,
}

impl RecordingChannel {
    /// Subjects sent to `user_id`, in send order.
    pub fn subjects_for(&self, user_id: DbId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, subject)| subject.clone())
            .collect()
    }

    /// Wait for the spawned deliveries to reach `count` notices for `user_id`.
    pub async fn wait_for(&self, user_id: DbId, count: usize) -> Vec<String> {
        for _ in 0..50 {
            let subjects = self.subjects_for(user_id);
            if subjects.len() >= count {
                return subjects;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.subjects_for(user_id)
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
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
            .push((recipient.id, notice.subject.clone()));
        Ok(SendOutcome::Sent)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert an approved user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, name: &str, role: &str) -> User {
    create_user_with_approval(pool, name, role, true).await
}

pub async fn create_user_with_approval(
    pool: &PgPool,
    name: &str,
    role: &str,
    is_approved: bool,
) -> User {
    let input = CreateUser {
        name: name.to_string(),
        email: format!("{}@test.com", name.to_lowercase().replace(' ', ".")),
        phone: None,
        password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        role: role.to_string(),
        is_approved,
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

pub async fn create_admin(pool: &PgPool) -> User {
    create_user(pool, "Ada Admin", ROLE_ADMIN).await
}

pub async fn create_staff(pool: &PgPool, name: &str) -> User {
    create_user(pool, name, ROLE_STAFF).await
}

pub async fn create_customer(pool: &PgPool, name: &str) -> User {
    create_user(pool, name, ROLE_CUSTOMER).await
}

pub async fn create_service(pool: &PgPool, name: &str) -> Service {
    let input = CreateService {
        name: name.to_string(),
        description: Some(format!("{name} description")),
        price: 99.0,
        duration_minutes: Some(60),
        is_active: Some(true),
    };
    ServiceRepo::create(pool, &input)
        .await
        .expect("service creation should succeed")
}

/// Mint an access token for `user` with the test secret.
pub fn token_for(user: &User) -> String {
    issue_access_token(user.id, &user.role, &test_config().jwt)
        .expect("token generation should succeed")
        .token
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should complete")
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request("POST", uri, None, body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request("POST", uri, Some(token), body)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request("PATCH", uri, Some(token), body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request("PUT", uri, Some(token), body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

/// Collect a response body as UTF-8 text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).expect("response body should be UTF-8")
}
