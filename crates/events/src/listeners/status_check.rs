//! Listener for the STATUS_CHECK intent: readiness polling for in-flight
//! rows.

use std::sync::Arc;

use async_trait::async_trait;

use croft_cluster::ClusterBackend;
use croft_core::state_machine;
use croft_core::status::ResourceStatus;
use croft_db::repositories::ResourceRepo;
use croft_db::DbPool;

use crate::bus::ReconcileEvent;
use crate::hub::TransitionListener;
use crate::listeners::{backend_target, load_fresh, mark_failed, retry_intent_for};

/// Drives an in-flight row (STARTING, STOPPING, TERMINATING) toward its
/// target state.
///
/// Each check first re-issues the idempotent operation behind the in-flight
/// status. That makes the poll self-healing: if the operation was never
/// issued (a crash between the status write and the backend call, or a
/// desired-state flip from the CRUD side) the re-issue performs it, and if
/// it was, the backend treats it as a no-op. Then the backend is polled; the
/// row advances only when the backend reports the target state, otherwise
/// the lease is released and a later tick polls again.
pub struct StatusCheckListener {
    pool: DbPool,
    backend: Arc<dyn ClusterBackend>,
}

impl StatusCheckListener {
    pub fn new(pool: DbPool, backend: Arc<dyn ClusterBackend>) -> Self {
        Self { pool, backend }
    }
}

#[async_trait]
impl TransitionListener for StatusCheckListener {
    async fn handle(&self, event: &ReconcileEvent) -> Result<(), sqlx::Error> {
        let expected = [
            ResourceStatus::Starting,
            ResourceStatus::Stopping,
            ResourceStatus::Terminating,
        ];
        let Some((resource, status)) = load_fresh(&self.pool, event, &expected).await? else {
            return Ok(());
        };

        let Some(target) = state_machine::target_of(status) else {
            return Ok(());
        };
        let retry = retry_intent_for(status);

        let (scope, workload) = match backend_target(&resource) {
            Ok(pair) => pair,
            Err(e) => return mark_failed(&self.pool, resource.id, retry, &e).await,
        };

        let reissue = match status {
            ResourceStatus::Stopping => self.backend.stop(&scope, &workload).await,
            ResourceStatus::Terminating => self.backend.delete(&scope, &workload).await,
            _ => self.backend.start(&scope, &workload).await,
        };
        if let Err(e) = reissue {
            return mark_failed(&self.pool, resource.id, retry, &e).await;
        }

        match self.backend.get_status(&scope, &workload).await {
            Ok(state) if state.status == target => {
                if target == ResourceStatus::Running {
                    let info = state
                        .connection_info
                        .unwrap_or_else(|| serde_json::json!({}));
                    ResourceRepo::mark_running(&self.pool, resource.id, &info).await?;
                } else {
                    ResourceRepo::update_status(&self.pool, resource.id, target, true).await?;
                }
                Ok(())
            }
            Ok(state) => {
                tracing::debug!(
                    resource_id = resource.id,
                    status = status.name(),
                    backend_status = state.status.name(),
                    "Backend not at target yet, will poll again"
                );
                ResourceRepo::release_lease(&self.pool, resource.id).await
            }
            Err(e) => mark_failed(&self.pool, resource.id, retry, &e).await,
        }
    }
}
