//! Typed table access. One repository per entity, as unit structs with
//! static async methods.

pub mod event_repo;
pub mod project_repo;
pub mod resource_repo;

pub use event_repo::EventRepo;
pub use project_repo::ProjectRepo;
pub use resource_repo::{ResourceRepo, TransitionError};
