//! Listener for the CREATE intent: first provisioning of a CREATING row.

use std::sync::Arc;

use async_trait::async_trait;

use croft_cluster::ClusterBackend;
use croft_core::status::{Intent, ResourceStatus};
use croft_db::DbPool;

use crate::bus::ReconcileEvent;
use crate::hub::TransitionListener;
use crate::listeners::{advance_to, backend_target, load_fresh, mark_failed};

/// Issues the backend create and moves the row to STARTING.
///
/// Also the retry target for rows that failed while creating: an ERROR row
/// with a recorded CREATE intent lands here again, and the idempotent
/// backend create makes the re-issue safe.
pub struct CreateListener {
    pool: DbPool,
    backend: Arc<dyn ClusterBackend>,
}

impl CreateListener {
    pub fn new(pool: DbPool, backend: Arc<dyn ClusterBackend>) -> Self {
        Self { pool, backend }
    }
}

#[async_trait]
impl TransitionListener for CreateListener {
    async fn handle(&self, event: &ReconcileEvent) -> Result<(), sqlx::Error> {
        let expected = [ResourceStatus::Creating, ResourceStatus::Error];
        let Some((resource, _)) = load_fresh(&self.pool, event, &expected).await? else {
            return Ok(());
        };

        let (scope, target) = match backend_target(&resource) {
            Ok(pair) => pair,
            Err(e) => return mark_failed(&self.pool, resource.id, Intent::Create, &e).await,
        };

        match self.backend.create(&scope, &target).await {
            Ok(()) => advance_to(&self.pool, &resource, ResourceStatus::Starting).await,
            Err(e) => mark_failed(&self.pool, resource.id, Intent::Create, &e).await,
        }
    }
}
