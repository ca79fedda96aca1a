//! Project entity model and DTOs.

use croft_core::status::{ProjectStatus, StatusId};
use croft_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::resource::Resource;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub owner_id: DbId,
    pub name: String,
    pub namespace: String,
    /// Derived from child resource statuses; written only by the aggregator.
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// Typed status, `None` on schema drift.
    pub fn status(&self) -> Option<ProjectStatus> {
        ProjectStatus::from_id(self.status_id)
    }
}

/// DTO for creating a new project with its environment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub owner_id: DbId,
    pub namespace: String,
}

/// A freshly created project together with its child resources
/// (all status CREATING, leases unset).
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedProject {
    pub project: Project,
    pub resources: Vec<Resource>,
}
