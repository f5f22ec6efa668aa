use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use servicedesk_api::config::ServerConfig;
use servicedesk_api::media::MediaClient;
use servicedesk_api::router::build_app_router;
use servicedesk_api::state::AppState;
use servicedesk_api::ws;
use servicedesk_events::{
    AuditPersistence, CachedSettingsProvider, DbSettingsSource, EmailChannel, EventBus,
    NotificationChannel, Notifier, RealtimeHub, WhatsAppChannel,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "servicedesk_api=debug,servicedesk_events=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = servicedesk_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    servicedesk_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    servicedesk_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Real-time hub ---
    let hub = Arc::new(RealtimeHub::new());

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&hub));

    // --- Notification settings and channels ---
    let settings = Arc::new(CachedSettingsProvider::new(
        Arc::new(DbSettingsSource::new(pool.clone())),
        Duration::from_secs(config.notification_settings_ttl_secs),
    ));
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![
        Arc::new(EmailChannel::new(Arc::clone(&settings))),
        Arc::new(WhatsAppChannel::new(Arc::clone(&settings))),
    ];
    let notifier = Notifier::new(pool.clone(), Arc::clone(&hub), channels);

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    // Spawn audit persistence (writes every event to audit_logs).
    let persistence_handle = tokio::spawn(AuditPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));
    tracing::info!("Event bus and audit persistence started");

    // --- Media storage ---
    let media = Arc::new(MediaClient::new(config.media.clone()));
    if !media.is_configured() {
        tracing::warn!("Media storage not configured, uploads are disabled");
    }

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        hub: Arc::clone(&hub),
        event_bus: Arc::clone(&event_bus),
        notifier,
        settings,
        media,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Dropping the last bus handle closes the broadcast channel, which ends
    // audit persistence once it has drained.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    tracing::info!("Audit persistence shut down");

    let ws_count = hub.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    hub.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
