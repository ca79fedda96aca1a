//! Repository for the `reconcile_events` audit log.

use sqlx::PgPool;

use croft_core::status::{Intent, ResourceKind};
use croft_core::types::DbId;

use crate::models::event::ReconcileEventRow;

/// Column list for `reconcile_events` queries.
const COLUMNS: &str = "\
    id, kind_id, intent_id, resource_id, project_id, owner_id, payload, \
    created_at, updated_at";

/// Append-only access to the reconcile event audit log.
pub struct EventRepo;

impl EventRepo {
    /// Insert one audit row. Returns the new row id.
    pub async fn insert(
        pool: &PgPool,
        kind: ResourceKind,
        intent: Intent,
        resource_id: DbId,
        project_id: DbId,
        owner_id: DbId,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO reconcile_events \
                 (kind_id, intent_id, resource_id, project_id, owner_id, payload) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(kind.id())
        .bind(intent.id())
        .bind(resource_id)
        .bind(project_id)
        .bind(owner_id)
        .bind(payload)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// Most recent events for one resource, newest first.
    pub async fn list_by_resource(
        pool: &PgPool,
        resource_id: DbId,
        limit: i64,
    ) -> Result<Vec<ReconcileEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reconcile_events \
             WHERE resource_id = $1 \
             ORDER BY id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, ReconcileEventRow>(&query)
            .bind(resource_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
