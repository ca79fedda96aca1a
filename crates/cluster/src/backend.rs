//! The [`ClusterBackend`] trait and its error taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use croft_core::status::{ResourceKind, ResourceStatus};
use croft_core::types::DbId;

/// Errors surfaced by a cluster backend.
///
/// The split drives retry behaviour: transient failures self-heal on a later
/// tick, permanent ones keep failing until someone fixes the configuration;
/// both are surfaced to the user through the aggregated project status.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Network, timeout, rate-limit: retrying later can succeed.
    #[error("Transient backend failure: {0}")]
    Transient(String),

    /// Missing credentials/scope, invalid name: retrying cannot succeed
    /// without external intervention.
    #[error("Permanent configuration error: {0}")]
    Permanent(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Transient(_))
    }
}

/// The owning user and namespace every backend call is scoped to.
///
/// Resolved once per operation, before any call is made; an invalid scope is
/// a permanent configuration error, never a transient one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendScope {
    pub owner_id: DbId,
    pub namespace: String,
}

impl BackendScope {
    /// Validate and build a scope. Namespaces follow cluster naming rules:
    /// non-empty, lowercase alphanumeric and hyphens.
    pub fn resolve(owner_id: DbId, namespace: &str) -> Result<Self, BackendError> {
        if namespace.is_empty() {
            return Err(BackendError::Permanent(
                "Backend scope has an empty namespace".to_string(),
            ));
        }
        if !namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(BackendError::Permanent(format!(
                "Invalid namespace \"{namespace}\": expected lowercase alphanumerics and hyphens"
            )));
        }
        Ok(Self {
            owner_id,
            namespace: namespace.to_string(),
        })
    }
}

/// Reference to one cluster workload within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
}

/// Live backend state of one workload, as reported by `get_status`.
#[derive(Debug, Clone)]
pub struct BackendState {
    pub status: ResourceStatus,
    /// Present once the workload is reachable (host/port/credentials ref).
    pub connection_info: Option<serde_json::Value>,
}

/// Idempotent cluster operations, per resource kind.
///
/// Every method is safe to call repeatedly for the same workload: `create`
/// on an existing workload, `start` on a running one, and `delete` on an
/// absent one are all no-ops. The reconciler relies on this: readiness
/// polling re-issues the in-flight operation on every pass.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// Provision a workload. The workload boots asynchronously; readiness is
    /// observed through [`ClusterBackend::get_status`].
    async fn create(&self, scope: &BackendScope, res: &ResourceRef) -> Result<(), BackendError>;

    /// Start a stopped workload.
    async fn start(&self, scope: &BackendScope, res: &ResourceRef) -> Result<(), BackendError>;

    /// Stop a running workload, keeping its data.
    async fn stop(&self, scope: &BackendScope, res: &ResourceRef) -> Result<(), BackendError>;

    /// Tear a workload down. Deletion is asynchronous like everything else.
    async fn delete(&self, scope: &BackendScope, res: &ResourceRef) -> Result<(), BackendError>;

    /// Live read of the workload's state, mapped into the engine's status
    /// enum.
    async fn get_status(
        &self,
        scope: &BackendScope,
        res: &ResourceRef,
    ) -> Result<BackendState, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn scope_accepts_valid_namespace() {
        let scope = BackendScope::resolve(7, "team-a-dev").unwrap();
        assert_eq!(scope.namespace, "team-a-dev");
        assert_eq!(scope.owner_id, 7);
    }

    #[test]
    fn scope_rejects_empty_namespace_as_permanent() {
        let err = BackendScope::resolve(7, "").unwrap_err();
        assert_matches!(err, BackendError::Permanent(_));
        assert!(!err.is_transient());
    }

    #[test]
    fn scope_rejects_invalid_characters() {
        for ns in ["Team-A", "ns_underscore", "ns.dot", "ns space"] {
            assert_matches!(
                BackendScope::resolve(7, ns).unwrap_err(),
                BackendError::Permanent(_),
                "{ns}"
            );
        }
    }

    #[test]
    fn transient_errors_are_flagged() {
        assert!(BackendError::Transient("timeout".into()).is_transient());
        assert!(!BackendError::Permanent("bad name".into()).is_transient());
    }
}
