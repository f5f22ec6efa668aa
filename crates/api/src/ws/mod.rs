//! WebSocket transport for real-time chat and notification delivery.
//!
//! Connections authenticate with `?token=` on the upgrade request and are
//! registered with the [`RealtimeHub`](servicedesk_events::RealtimeHub),
//! which owns all topic bookkeeping.

mod handler;
mod heartbeat;

pub use handler::{ws_handler, ClientCommand, WsAuthQuery};
pub use heartbeat::start_heartbeat;
