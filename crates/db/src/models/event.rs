//! Reconcile event audit log row.

use croft_core::status::StatusId;
use croft_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `reconcile_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReconcileEventRow {
    pub id: DbId,
    pub kind_id: StatusId,
    pub intent_id: StatusId,
    pub resource_id: DbId,
    pub project_id: DbId,
    pub owner_id: DbId,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
