//! Durable event persistence service.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and writes every received [`ReconcileEvent`] to the
//! `reconcile_events` audit log. It runs as a long-lived background task and
//! shuts down when the bus sender is dropped.

use tokio::sync::broadcast;

use croft_core::types::DbId;
use croft_db::repositories::EventRepo;
use croft_db::DbPool;

use crate::bus::ReconcileEvent;

/// Background service that persists reconcile events to the database.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop.
    ///
    /// Persists every event it receives. A failed insert is logged and the
    /// loop moves on; the audit log is best-effort, reconciliation must not
    /// depend on it.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<ReconcileEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            resource_id = event.resource_id,
                            intent = event.intent.name(),
                            "Failed to persist reconcile event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not recorded"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    /// Write a single event to the `reconcile_events` table.
    async fn persist(pool: &DbPool, event: &ReconcileEvent) -> Result<DbId, sqlx::Error> {
        let payload = serde_json::json!({ "emitted_at": event.timestamp });
        EventRepo::insert(
            pool,
            event.kind,
            event.intent,
            event.resource_id,
            event.project_id,
            event.owner_id,
            &payload,
        )
        .await
    }
}
