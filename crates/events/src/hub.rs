//! Event dispatch: routes each [`ReconcileEvent`] to the transition listener
//! registered for its `(kind, intent)` pair.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Semaphore};

use croft_core::status::{Intent, ResourceKind};

use crate::bus::ReconcileEvent;

/// A handler for one `(kind, intent)` route.
///
/// Implementations must be idempotent: the scheduler re-emits an event
/// whenever a lease lapses without a status write, so the same logical unit
/// of work can be handled more than once. They must also contain their own
/// failures by marking the resource ERROR; an `Err` return is reserved for
/// infrastructure faults (the database itself unreachable) and is logged by
/// the hub, never propagated.
#[async_trait]
pub trait TransitionListener: Send + Sync {
    async fn handle(&self, event: &ReconcileEvent) -> Result<(), sqlx::Error>;
}

/// Default cap on concurrently running listener invocations.
const DEFAULT_CONCURRENCY: usize = 16;

/// Routing table plus the dispatch loop.
///
/// Routes are registered once at startup and never change afterwards, so
/// dispatch reads the map without locking.
pub struct ListenerHub {
    routes: HashMap<(ResourceKind, Intent), Arc<dyn TransitionListener>>,
    limiter: Arc<Semaphore>,
}

impl Default for ListenerHub {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl ListenerHub {
    pub fn new(concurrency: usize) -> Self {
        Self {
            routes: HashMap::new(),
            limiter: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Register the listener for one `(kind, intent)` route.
    pub fn register(
        &mut self,
        kind: ResourceKind,
        intent: Intent,
        listener: Arc<dyn TransitionListener>,
    ) {
        self.routes.insert((kind, intent), listener);
    }

    /// Dispatch one event to its registered listener.
    ///
    /// An unrouted event is logged and dropped; the row's lease will lapse
    /// and the work re-surfaces on a later tick.
    pub async fn dispatch(&self, event: &ReconcileEvent) {
        let Some(listener) = self.routes.get(&(event.kind, event.intent)) else {
            tracing::warn!(
                kind = event.kind.name(),
                intent = event.intent.name(),
                resource_id = event.resource_id,
                "No listener registered for event"
            );
            return;
        };

        if let Err(e) = listener.handle(event).await {
            tracing::error!(
                error = %e,
                kind = event.kind.name(),
                intent = event.intent.name(),
                resource_id = event.resource_id,
                "Transition listener failed"
            );
        }
    }

    /// Run the dispatch loop until the bus is closed.
    ///
    /// Each event is handled on its own task so one slow backend call does
    /// not stall the queue; the semaphore bounds how many run at once.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<ReconcileEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Ok(permit) = Arc::clone(&self.limiter).acquire_owned().await else {
                        break;
                    };
                    let hub = Arc::clone(&self);
                    tokio::spawn(async move {
                        hub.dispatch(&event).await;
                        drop(permit);
                    });
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Listener hub lagged, skipped events resurface when their leases lapse"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, listener hub shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use crate::bus::EventBus;

    struct CountingListener {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TransitionListener for CountingListener {
        async fn handle(&self, _event: &ReconcileEvent) -> Result<(), sqlx::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event(kind: ResourceKind, intent: Intent) -> ReconcileEvent {
        ReconcileEvent {
            kind,
            intent,
            resource_id: 1,
            project_id: 1,
            owner_id: 1,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dispatch_routes_on_kind_and_intent() {
        let sandbox_create = Arc::new(CountingListener {
            calls: AtomicUsize::new(0),
        });
        let database_create = Arc::new(CountingListener {
            calls: AtomicUsize::new(0),
        });

        let mut hub = ListenerHub::default();
        hub.register(
            ResourceKind::Sandbox,
            Intent::Create,
            Arc::clone(&sandbox_create) as Arc<dyn TransitionListener>,
        );
        hub.register(
            ResourceKind::Database,
            Intent::Create,
            Arc::clone(&database_create) as Arc<dyn TransitionListener>,
        );

        hub.dispatch(&event(ResourceKind::Sandbox, Intent::Create)).await;
        hub.dispatch(&event(ResourceKind::Sandbox, Intent::Create)).await;
        hub.dispatch(&event(ResourceKind::Database, Intent::Create)).await;

        assert_eq!(sandbox_create.calls.load(Ordering::SeqCst), 2);
        assert_eq!(database_create.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unrouted_event_is_dropped_without_panic() {
        let hub = ListenerHub::default();
        hub.dispatch(&event(ResourceKind::Sandbox, Intent::Stop)).await;
    }

    #[tokio::test]
    async fn run_consumes_events_from_the_bus() {
        let listener = Arc::new(CountingListener {
            calls: AtomicUsize::new(0),
        });
        let mut hub = ListenerHub::default();
        hub.register(
            ResourceKind::Sandbox,
            Intent::Create,
            Arc::clone(&listener) as Arc<dyn TransitionListener>,
        );

        let bus = EventBus::default();
        let receiver = bus.subscribe();
        let handle = tokio::spawn(Arc::new(hub).run(receiver));

        bus.publish(event(ResourceKind::Sandbox, Intent::Create));
        bus.publish(event(ResourceKind::Sandbox, Intent::Create));
        drop(bus);

        handle.await.unwrap();
        // The loop may exit before spawned handlers finish; give them a beat.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(listener.calls.load(Ordering::SeqCst), 2);
    }
}
