//! Service desk event, notification and real-time infrastructure.
//!
//! - [`EventBus`] — in-process publish/subscribe hub for [`PlatformEvent`]s,
//!   backed by `tokio::sync::broadcast`.
//! - [`AuditPersistence`] — background service writing every event to
//!   `audit_logs`.
//! - [`RealtimeHub`] — topic-based fan-out to live client connections,
//!   independent of the socket transport.
//! - [`Notifier`] — never-fail notification port: in-app rows plus external
//!   [`NotificationChannel`]s (email, WhatsApp).
//! - [`CachedSettingsProvider`] — TTL cache over the channel settings.

pub mod bus;
pub mod delivery;
pub mod notifier;
pub mod persistence;
pub mod realtime;
pub mod settings;
pub mod templates;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::email::{EmailChannel, EmailConfig};
pub use delivery::whatsapp::{WhatsAppChannel, WhatsAppConfig};
pub use delivery::{ChannelError, NotificationChannel};
pub use notifier::{ExternalNotice, InAppNotice, Notice, Notifier, Recipient};
pub use persistence::AuditPersistence;
pub use realtime::{Delivery, RealtimeEvent, RealtimeHub, Topic};
pub use settings::{
    CachedSettingsProvider, DbSettingsSource, NotificationSettings, SettingsSource,
};
