//! Reconciler process wiring: configuration and the per-kind scheduler.
//!
//! The binary in `main.rs` assembles these with the event bus, listener hub,
//! and persistence task from `croft-events`.

pub mod config;
pub mod scheduler;

pub use config::{ConfigError, ReconcilerConfig};
pub use scheduler::ReconcileScheduler;
