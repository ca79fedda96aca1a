//! Listener for the STOP intent.

use std::sync::Arc;

use async_trait::async_trait;

use croft_cluster::ClusterBackend;
use croft_core::status::{Intent, ResourceStatus};
use croft_db::DbPool;

use crate::bus::ReconcileEvent;
use crate::hub::TransitionListener;
use crate::listeners::{advance_to, backend_target, load_fresh, mark_failed};

/// Issues the backend stop and moves the row to STOPPING.
///
/// Reached through ERROR retries, like [`StartListener`](crate::listeners::StartListener).
pub struct StopListener {
    pool: DbPool,
    backend: Arc<dyn ClusterBackend>,
}

impl StopListener {
    pub fn new(pool: DbPool, backend: Arc<dyn ClusterBackend>) -> Self {
        Self { pool, backend }
    }
}

#[async_trait]
impl TransitionListener for StopListener {
    async fn handle(&self, event: &ReconcileEvent) -> Result<(), sqlx::Error> {
        let expected = [ResourceStatus::Error, ResourceStatus::Stopping];
        let Some((resource, _)) = load_fresh(&self.pool, event, &expected).await? else {
            return Ok(());
        };

        let (scope, target) = match backend_target(&resource) {
            Ok(pair) => pair,
            Err(e) => return mark_failed(&self.pool, resource.id, Intent::Stop, &e).await,
        };

        match self.backend.stop(&scope, &target).await {
            Ok(()) => advance_to(&self.pool, &resource, ResourceStatus::Stopping).await,
            Err(e) => mark_failed(&self.pool, resource.id, Intent::Stop, &e).await,
        }
    }
}
