//! Resource entity model: one row per cluster-backed workload (a sandbox or
//! a database).

use croft_core::status::{Intent, ResourceKind, ResourceStatus, StatusId};
use croft_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `resources` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Resource {
    pub id: DbId,
    pub project_id: DbId,
    pub owner_id: DbId,
    pub kind_id: StatusId,
    /// Cluster-facing workload name, unique within `namespace`.
    pub name: String,
    pub namespace: String,
    pub status_id: StatusId,
    /// Lease: `None` or in the future while a worker owns the row.
    pub locked_until: Option<Timestamp>,
    /// Intent re-emitted when a row in error is reclaimed.
    pub retry_intent_id: Option<StatusId>,
    /// Kind-specific connection metadata, populated once running.
    pub connection_info: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Resource {
    /// Typed status, `None` if the row carries an id outside the enum
    /// (schema drift; callers treat it as unprocessable).
    pub fn status(&self) -> Option<ResourceStatus> {
        ResourceStatus::from_id(self.status_id)
    }

    /// Typed kind.
    pub fn kind(&self) -> Option<ResourceKind> {
        ResourceKind::from_id(self.kind_id)
    }

    /// Typed retry intent, if one was recorded at failure time.
    pub fn retry_intent(&self) -> Option<Intent> {
        self.retry_intent_id.and_then(Intent::from_id)
    }
}
