//! Cluster orchestration boundary.
//!
//! The reconciliation engine drives cluster workloads exclusively through
//! the [`ClusterBackend`] trait: idempotent create/start/stop/delete plus a
//! live status read, scoped to an owning user and namespace. Production
//! backends (the actual cluster control plane client) live outside this
//! repository; [`memory::InMemoryBackend`] serves tests and local
//! development.

pub mod backend;
pub mod memory;

pub use backend::{BackendError, BackendScope, BackendState, ClusterBackend, ResourceRef};
pub use memory::InMemoryBackend;
