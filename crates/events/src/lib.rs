//! Croft event bus and transition listeners.
//!
//! Building blocks for the event-driven half of the reconciliation engine:
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ReconcileEvent`]: the canonical unit of reconciliation work.
//! - [`ListenerHub`]: routes each event to the [`TransitionListener`]
//!   registered for its `(kind, intent)` pair.
//! - [`listeners`]: the per-intent handlers that drive cluster workloads.
//! - [`EventPersistence`]: background service that records every event in
//!   the audit log.

pub mod bus;
pub mod hub;
pub mod listeners;
pub mod persistence;

pub use bus::{EventBus, ReconcileEvent};
pub use hub::{ListenerHub, TransitionListener};
pub use persistence::EventPersistence;
