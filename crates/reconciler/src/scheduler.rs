//! Periodic reconciliation scheduler: one tick loop per resource kind.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use croft_core::state_machine;
use croft_core::status::ResourceKind;
use croft_db::repositories::ResourceRepo;
use croft_db::DbPool;
use croft_events::{EventBus, ReconcileEvent};

use crate::config::ReconcilerConfig;

/// Claims due rows and turns them into [`ReconcileEvent`]s.
///
/// The scheduler owns no transition logic: it derives each claimed row's
/// intent from its status and publishes, nothing more. Claimed rows stay
/// leased until the listener that handles the event writes a status or
/// releases the lease, so a crashed listener costs one lease period, never a
/// lost row.
pub struct ReconcileScheduler {
    pool: DbPool,
    bus: Arc<EventBus>,
    batch_size: i64,
    lease: Duration,
    tick_interval: Duration,
}

impl ReconcileScheduler {
    pub fn new(pool: DbPool, bus: Arc<EventBus>, config: &ReconcilerConfig) -> Self {
        Self {
            pool,
            bus,
            batch_size: config.claim_batch_size,
            lease: config.lease,
            tick_interval: config.tick_interval,
        }
    }

    /// Run the tick loop for one kind until the process shuts down.
    pub async fn run(self: Arc<Self>, kind: ResourceKind) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(kind = kind.name(), "Reconcile scheduler started");

        loop {
            ticker.tick().await;
            match self.tick_once(kind).await {
                Ok(0) => {}
                Ok(emitted) => {
                    tracing::debug!(kind = kind.name(), emitted, "Reconcile tick emitted events");
                }
                Err(e) => {
                    tracing::error!(error = %e, kind = kind.name(), "Reconcile tick failed");
                }
            }
        }
    }

    /// One scheduling pass: claim due rows of `kind` and publish an event
    /// per row. Returns how many events were emitted.
    pub async fn tick_once(&self, kind: ResourceKind) -> Result<usize, sqlx::Error> {
        let claimed =
            ResourceRepo::claim_batch(&self.pool, kind, self.batch_size, self.lease).await?;

        let mut emitted = 0;
        for resource in claimed {
            let Some(status) = resource.status() else {
                tracing::warn!(
                    resource_id = resource.id,
                    status_id = resource.status_id,
                    "Claimed row has unknown status id, leaving it leased"
                );
                continue;
            };

            match state_machine::intent_for(status, resource.retry_intent()) {
                Some(intent) => {
                    self.bus.publish(ReconcileEvent::new(kind, intent, &resource));
                    emitted += 1;
                }
                None => {
                    // An ERROR row without a recorded retry intent. The lease
                    // stays armed so the warning repeats once per lease
                    // period, not once per tick.
                    tracing::warn!(
                        resource_id = resource.id,
                        status = status.name(),
                        "No intent derivable for claimed row"
                    );
                }
            }
        }
        Ok(emitted)
    }
}
