//! Row models and DTOs.

pub mod event;
pub mod project;
pub mod resource;

pub use event::ReconcileEventRow;
pub use project::{CreateProject, Project, ProvisionedProject};
pub use resource::Resource;
