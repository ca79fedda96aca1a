//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub between the scheduler and the
//! transition listeners. It is designed to be shared via `Arc<EventBus>`
//! across the reconciler.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use croft_core::status::{Intent, ResourceKind};
use croft_core::types::{DbId, Timestamp};
use croft_db::models::resource::Resource;

// ---------------------------------------------------------------------------
// ReconcileEvent
// ---------------------------------------------------------------------------

/// One unit of reconciliation work: apply `intent` to the resource.
///
/// Events carry ids, not row snapshots. A listener always re-reads the row
/// before acting, so a stale event (the row moved on since the scheduler
/// claimed it) degrades to a no-op instead of a wrong write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileEvent {
    pub kind: ResourceKind,
    pub intent: Intent,
    pub resource_id: DbId,
    pub project_id: DbId,
    pub owner_id: DbId,
    /// When the scheduler emitted the event (UTC).
    pub timestamp: Timestamp,
}

impl ReconcileEvent {
    /// Build an event for a claimed resource row.
    pub fn new(kind: ResourceKind, intent: Intent, resource: &Resource) -> Self {
        Self {
            kind,
            intent,
            resource_id: resource.id,
            project_id: resource.project_id,
            owner_id: resource.owner_id,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers (the
/// listener hub, the audit log persistence task) independently receive every
/// published [`ReconcileEvent`].
pub struct EventBus {
    sender: broadcast::Sender<ReconcileEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`. A dropped event
    /// is not lost work: the row's lease lapses and a later tick re-emits it.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: ReconcileEvent) {
        // Ignore the SendError, it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ReconcileEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
