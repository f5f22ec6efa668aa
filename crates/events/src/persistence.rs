//! Audit trail persistence service.
//!
//! [`AuditPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every received [`PlatformEvent`] to `audit_logs`. It runs as a
//! long-lived background task and stops when the bus is dropped.

use servicedesk_db::models::audit::CreateAuditLog;
use servicedesk_db::repositories::AuditLogRepo;
use servicedesk_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

/// Background service that persists platform events as audit entries.
pub struct AuditPersistence;

impl AuditPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = AuditLogRepo::create(&pool, &to_audit_entry(&event)).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist audit entry"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Audit persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, audit persistence shutting down");
                    break;
                }
            }
        }
    }
}

/// Map an event onto an audit row. The event time is kept in `details`.
pub fn to_audit_entry(event: &PlatformEvent) -> CreateAuditLog {
    let mut details = event.payload.clone();
    if let Some(obj) = details.as_object_mut() {
        obj.insert(
            "occurred_at".into(),
            serde_json::Value::String(event.timestamp.to_rfc3339()),
        );
    }
    CreateAuditLog {
        actor_id: event.actor_user_id,
        action: event.event_type.clone(),
        entity_type: event.source_entity_type.clone(),
        entity_id: event.source_entity_id,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SERVICE_DELETED;

    #[test]
    fn event_maps_onto_audit_columns() {
        let event = PlatformEvent::new(SERVICE_DELETED)
            .with_source("service", 3)
            .with_actor(1)
            .with_payload(serde_json::json!({"name": "Data Recovery"}));

        let entry = to_audit_entry(&event);
        assert_eq!(entry.action, SERVICE_DELETED);
        assert_eq!(entry.entity_type.as_deref(), Some("service"));
        assert_eq!(entry.entity_id, Some(3));
        assert_eq!(entry.actor_id, Some(1));
        assert_eq!(entry.details["name"], "Data Recovery");
        assert!(entry.details["occurred_at"].is_string());
    }
}
