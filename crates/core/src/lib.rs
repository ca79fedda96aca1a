//! Shared leaf crate for the croft reconciliation engine.
//!
//! Everything in here is dependency-free with respect to the rest of the
//! workspace so it can be used by the repository layer, the event listeners,
//! and the reconciler binary alike:
//!
//! - [`types`]: database id and timestamp aliases.
//! - [`error`]: the [`CoreError`](error::CoreError) taxonomy.
//! - [`status`]: status / kind / intent enums backed by SMALLINT lookup ids.
//! - [`state_machine`]: resource lifecycle transitions and intent derivation.
//! - [`aggregate`]: child-status to project-status rollup.
//! - [`backoff`]: retry cadence for resources in ERROR.

pub mod aggregate;
pub mod backoff;
pub mod error;
pub mod state_machine;
pub mod status;
pub mod types;

pub use error::CoreError;
pub use status::{Intent, ProjectStatus, ResourceKind, ResourceStatus, StatusId};
