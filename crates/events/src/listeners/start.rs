//! Listener for the START intent.

use std::sync::Arc;

use async_trait::async_trait;

use croft_cluster::ClusterBackend;
use croft_core::status::{Intent, ResourceStatus};
use croft_db::DbPool;

use crate::bus::ReconcileEvent;
use crate::hub::TransitionListener;
use crate::listeners::{advance_to, backend_target, load_fresh, mark_failed};

/// Issues the backend start and moves the row to STARTING.
///
/// Reached through ERROR retries: a row that failed while starting records
/// the START intent and is re-emitted here once its backoff lapses. Fresh
/// start requests arrive as a STARTING row instead and go straight to the
/// status check route.
pub struct StartListener {
    pool: DbPool,
    backend: Arc<dyn ClusterBackend>,
}

impl StartListener {
    pub fn new(pool: DbPool, backend: Arc<dyn ClusterBackend>) -> Self {
        Self { pool, backend }
    }
}

#[async_trait]
impl TransitionListener for StartListener {
    async fn handle(&self, event: &ReconcileEvent) -> Result<(), sqlx::Error> {
        let expected = [ResourceStatus::Error, ResourceStatus::Starting];
        let Some((resource, _)) = load_fresh(&self.pool, event, &expected).await? else {
            return Ok(());
        };

        let (scope, target) = match backend_target(&resource) {
            Ok(pair) => pair,
            Err(e) => return mark_failed(&self.pool, resource.id, Intent::Start, &e).await,
        };

        match self.backend.start(&scope, &target).await {
            Ok(()) => advance_to(&self.pool, &resource, ResourceStatus::Starting).await,
            Err(e) => mark_failed(&self.pool, resource.id, Intent::Start, &e).await,
        }
    }
}
