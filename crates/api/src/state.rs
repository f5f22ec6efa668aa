use std::sync::Arc;

use servicedesk_events::{CachedSettingsProvider, EventBus, Notifier, RealtimeHub};

use crate::config::ServerConfig;
use crate::media::MediaClient;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: servicedesk_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Topic fan-out to live WebSocket connections.
    pub hub: Arc<RealtimeHub>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<EventBus>,
    /// In-app and external notification dispatcher.
    pub notifier: Notifier,
    /// Cached notification channel settings (SMTP, WhatsApp).
    pub settings: Arc<CachedSettingsProvider>,
    /// Client for the third-party media store.
    pub media: Arc<MediaClient>,
}
