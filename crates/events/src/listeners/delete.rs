//! Listener for the DELETE intent.

use std::sync::Arc;

use async_trait::async_trait;

use croft_cluster::ClusterBackend;
use croft_core::status::{Intent, ResourceStatus};
use croft_db::DbPool;

use crate::bus::ReconcileEvent;
use crate::hub::TransitionListener;
use crate::listeners::{advance_to, backend_target, load_fresh, mark_failed};

/// Issues the backend delete and moves the row to TERMINATING.
///
/// Reached through ERROR retries. The backend delete is a no-op for an
/// already absent workload, so replays converge on TERMINATED instead of
/// failing.
pub struct DeleteListener {
    pool: DbPool,
    backend: Arc<dyn ClusterBackend>,
}

impl DeleteListener {
    pub fn new(pool: DbPool, backend: Arc<dyn ClusterBackend>) -> Self {
        Self { pool, backend }
    }
}

#[async_trait]
impl TransitionListener for DeleteListener {
    async fn handle(&self, event: &ReconcileEvent) -> Result<(), sqlx::Error> {
        let expected = [ResourceStatus::Error, ResourceStatus::Terminating];
        let Some((resource, _)) = load_fresh(&self.pool, event, &expected).await? else {
            return Ok(());
        };

        let (scope, target) = match backend_target(&resource) {
            Ok(pair) => pair,
            Err(e) => return mark_failed(&self.pool, resource.id, Intent::Delete, &e).await,
        };

        match self.backend.delete(&scope, &target).await {
            Ok(()) => advance_to(&self.pool, &resource, ResourceStatus::Terminating).await,
            Err(e) => mark_failed(&self.pool, resource.id, Intent::Delete, &e).await,
        }
    }
}
