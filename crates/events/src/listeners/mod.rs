//! Transition listeners: one handler per reconciliation intent.
//!
//! Every listener follows the same contract. It re-reads its row first and
//! skips silently when the row has moved on, issues an idempotent backend
//! operation, then writes exactly one status. Backend failures never
//! propagate: the listener marks the row ERROR with the intent to retry and
//! re-arms the lease as the backoff gate.

pub mod create;
pub mod delete;
pub mod start;
pub mod status_check;
pub mod stop;

pub use create::CreateListener;
pub use delete::DeleteListener;
pub use start::StartListener;
pub use status_check::StatusCheckListener;
pub use stop::StopListener;

use croft_cluster::{BackendError, BackendScope, ResourceRef};
use croft_core::backoff::error_backoff;
use croft_core::status::{Intent, ResourceStatus};
use croft_db::models::resource::Resource;
use croft_db::repositories::ResourceRepo;
use croft_db::DbPool;

use crate::bus::ReconcileEvent;

/// Re-read the event's row and return it only when its status is one the
/// listener acts on.
///
/// `None` means skip: the row vanished or another writer advanced it after
/// the scheduler claimed it. Skipping is the idempotency backstop, a
/// duplicated or stale event degrades to a no-op here.
pub(crate) async fn load_fresh(
    pool: &DbPool,
    event: &ReconcileEvent,
    expected: &[ResourceStatus],
) -> Result<Option<(Resource, ResourceStatus)>, sqlx::Error> {
    let Some(resource) = ResourceRepo::find_by_id(pool, event.resource_id).await? else {
        tracing::warn!(
            resource_id = event.resource_id,
            intent = event.intent.name(),
            "Skipping event for missing resource"
        );
        return Ok(None);
    };

    match resource.status() {
        Some(status) if expected.contains(&status) => Ok(Some((resource, status))),
        Some(status) => {
            tracing::debug!(
                resource_id = resource.id,
                intent = event.intent.name(),
                status = status.name(),
                "Skipping stale event, row has moved on"
            );
            Ok(None)
        }
        None => {
            tracing::warn!(
                resource_id = resource.id,
                status_id = resource.status_id,
                "Skipping event for resource with unknown status id"
            );
            Ok(None)
        }
    }
}

/// Resolve the backend scope and workload reference for a row.
pub(crate) fn backend_target(
    resource: &Resource,
) -> Result<(BackendScope, ResourceRef), BackendError> {
    let kind = resource.kind().ok_or_else(|| {
        BackendError::Permanent(format!("Unknown resource kind id {}", resource.kind_id))
    })?;
    let scope = BackendScope::resolve(resource.owner_id, &resource.namespace)?;
    Ok((
        scope,
        ResourceRef {
            kind,
            name: resource.name.clone(),
        },
    ))
}

/// Record a backend failure: the row goes to ERROR with `retry` stored for
/// re-emission and the lease re-armed as the backoff gate.
pub(crate) async fn mark_failed(
    pool: &DbPool,
    resource_id: croft_core::types::DbId,
    retry: Intent,
    err: &BackendError,
) -> Result<(), sqlx::Error> {
    tracing::warn!(
        resource_id,
        retry_intent = retry.name(),
        transient = err.is_transient(),
        error = %err,
        "Backend operation failed, resource marked for retry"
    );
    ResourceRepo::mark_error(pool, resource_id, retry, error_backoff()).await?;
    Ok(())
}

/// Put a row into its in-flight state after the backend accepted the
/// operation. When the row is already in flight (an ERROR retry that was
/// raced, or a duplicated event) only the lease is released.
pub(crate) async fn advance_to(
    pool: &DbPool,
    resource: &Resource,
    in_flight: ResourceStatus,
) -> Result<(), sqlx::Error> {
    if resource.status() == Some(in_flight) {
        ResourceRepo::release_lease(pool, resource.id).await
    } else {
        ResourceRepo::update_status(pool, resource.id, in_flight, true)
            .await
            .map(|_| ())
    }
}

/// The intent that re-issues the operation behind an in-flight status.
pub(crate) fn retry_intent_for(in_flight: ResourceStatus) -> Intent {
    match in_flight {
        ResourceStatus::Stopping => Intent::Stop,
        ResourceStatus::Terminating => Intent::Delete,
        _ => Intent::Start,
    }
}
