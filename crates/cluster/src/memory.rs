//! In-memory cluster backend for tests and local development.
//!
//! Simulates the asynchronous nature of real provisioning: an in-flight
//! operation completes only after a configurable number of status polls, so
//! the engine's readiness loop is exercised for real. Failures can be
//! injected per workload name to drive the error/retry paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use croft_core::status::{ResourceKind, ResourceStatus};

use crate::backend::{BackendError, BackendScope, BackendState, ClusterBackend, ResourceRef};

/// Failure injected for a workload name; every operation on it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Transient,
    Permanent,
}

#[derive(Debug)]
struct Workload {
    kind: ResourceKind,
    phase: ResourceStatus,
    /// Status polls remaining before an in-flight phase completes.
    polls_left: u32,
}

/// Simulated cluster keyed by `(namespace, workload name)`.
pub struct InMemoryBackend {
    ready_after_polls: u32,
    workloads: Mutex<HashMap<(String, String), Workload>>,
    failures: Mutex<HashMap<String, FailureMode>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(1)
    }
}

impl InMemoryBackend {
    /// A backend whose in-flight operations complete after
    /// `ready_after_polls` status reads.
    pub fn new(ready_after_polls: u32) -> Self {
        Self {
            ready_after_polls,
            workloads: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Make every operation on `name` fail until cleared.
    pub fn fail_with(&self, name: &str, mode: FailureMode) {
        self.failures.lock().unwrap().insert(name.to_string(), mode);
    }

    /// Clear an injected failure.
    pub fn clear_failure(&self, name: &str) {
        self.failures.lock().unwrap().remove(name);
    }

    /// Current phase of a workload, for assertions.
    pub fn phase_of(&self, namespace: &str, name: &str) -> Option<ResourceStatus> {
        self.workloads
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .map(|w| w.phase)
    }

    fn check_failure(&self, name: &str) -> Result<(), BackendError> {
        match self.failures.lock().unwrap().get(name) {
            Some(FailureMode::Transient) => Err(BackendError::Transient(format!(
                "Injected transient failure for {name}"
            ))),
            Some(FailureMode::Permanent) => Err(BackendError::Permanent(format!(
                "Injected permanent failure for {name}"
            ))),
            None => Ok(()),
        }
    }

    fn key(scope: &BackendScope, res: &ResourceRef) -> (String, String) {
        (scope.namespace.clone(), res.name.clone())
    }

    fn connection_info(kind: ResourceKind, namespace: &str, name: &str) -> serde_json::Value {
        let port = match kind {
            ResourceKind::Sandbox => 2222,
            ResourceKind::Database => 5432,
        };
        serde_json::json!({
            "host": format!("{name}.{namespace}.svc.cluster.local"),
            "port": port,
        })
    }
}

#[async_trait]
impl ClusterBackend for InMemoryBackend {
    async fn create(&self, scope: &BackendScope, res: &ResourceRef) -> Result<(), BackendError> {
        self.check_failure(&res.name)?;
        let mut workloads = self.workloads.lock().unwrap();
        // Idempotent: re-creating an existing workload is a no-op.
        workloads.entry(Self::key(scope, res)).or_insert(Workload {
            kind: res.kind,
            phase: ResourceStatus::Starting,
            polls_left: self.ready_after_polls,
        });
        Ok(())
    }

    async fn start(&self, scope: &BackendScope, res: &ResourceRef) -> Result<(), BackendError> {
        self.check_failure(&res.name)?;
        let mut workloads = self.workloads.lock().unwrap();
        let workload = workloads
            .get_mut(&Self::key(scope, res))
            .ok_or_else(|| BackendError::Permanent(format!("Unknown workload {}", res.name)))?;
        // No-op unless actually stopped; an in-flight start keeps its countdown.
        if workload.phase == ResourceStatus::Stopped {
            workload.phase = ResourceStatus::Starting;
            workload.polls_left = self.ready_after_polls;
        }
        Ok(())
    }

    async fn stop(&self, scope: &BackendScope, res: &ResourceRef) -> Result<(), BackendError> {
        self.check_failure(&res.name)?;
        let mut workloads = self.workloads.lock().unwrap();
        let workload = workloads
            .get_mut(&Self::key(scope, res))
            .ok_or_else(|| BackendError::Permanent(format!("Unknown workload {}", res.name)))?;
        if matches!(workload.phase, ResourceStatus::Running | ResourceStatus::Starting) {
            workload.phase = ResourceStatus::Stopping;
            workload.polls_left = self.ready_after_polls;
        }
        Ok(())
    }

    async fn delete(&self, scope: &BackendScope, res: &ResourceRef) -> Result<(), BackendError> {
        self.check_failure(&res.name)?;
        let mut workloads = self.workloads.lock().unwrap();
        // Idempotent: deleting an absent workload is a no-op.
        if let Some(workload) = workloads.get_mut(&Self::key(scope, res)) {
            if !matches!(
                workload.phase,
                ResourceStatus::Terminating | ResourceStatus::Terminated
            ) {
                workload.phase = ResourceStatus::Terminating;
                workload.polls_left = self.ready_after_polls;
            }
        }
        Ok(())
    }

    async fn get_status(
        &self,
        scope: &BackendScope,
        res: &ResourceRef,
    ) -> Result<BackendState, BackendError> {
        self.check_failure(&res.name)?;
        let mut workloads = self.workloads.lock().unwrap();
        let Some(workload) = workloads.get_mut(&Self::key(scope, res)) else {
            // Absent means gone: the delete flow converges on this.
            return Ok(BackendState {
                status: ResourceStatus::Terminated,
                connection_info: None,
            });
        };

        // Each poll ticks an in-flight phase toward completion.
        if matches!(
            workload.phase,
            ResourceStatus::Starting | ResourceStatus::Stopping | ResourceStatus::Terminating
        ) {
            workload.polls_left = workload.polls_left.saturating_sub(1);
            if workload.polls_left == 0 {
                workload.phase = match workload.phase {
                    ResourceStatus::Starting => ResourceStatus::Running,
                    ResourceStatus::Stopping => ResourceStatus::Stopped,
                    ResourceStatus::Terminating => ResourceStatus::Terminated,
                    other => other,
                };
            }
        }

        let connection_info = (workload.phase == ResourceStatus::Running)
            .then(|| Self::connection_info(workload.kind, &scope.namespace, &res.name));

        Ok(BackendState {
            status: workload.phase,
            connection_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn scope() -> BackendScope {
        BackendScope::resolve(1, "ns-test").unwrap()
    }

    fn sandbox(name: &str) -> ResourceRef {
        ResourceRef {
            kind: ResourceKind::Sandbox,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_poll_until_running() {
        let backend = InMemoryBackend::new(2);
        let res = sandbox("sbx-1");
        backend.create(&scope(), &res).await.unwrap();

        let first = backend.get_status(&scope(), &res).await.unwrap();
        assert_eq!(first.status, ResourceStatus::Starting);
        assert!(first.connection_info.is_none());

        let second = backend.get_status(&scope(), &res).await.unwrap();
        assert_eq!(second.status, ResourceStatus::Running);
        let info = second.connection_info.unwrap();
        assert_eq!(info["host"], "sbx-1.ns-test.svc.cluster.local");
        assert_eq!(info["port"], 2222);
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let backend = InMemoryBackend::new(1);
        let res = sandbox("sbx-1");
        backend.create(&scope(), &res).await.unwrap();
        backend.get_status(&scope(), &res).await.unwrap(); // -> Running

        // Re-creating must not reset the workload.
        backend.create(&scope(), &res).await.unwrap();
        let state = backend.get_status(&scope(), &res).await.unwrap();
        assert_eq!(state.status, ResourceStatus::Running);
    }

    #[tokio::test]
    async fn start_on_running_workload_is_noop() {
        let backend = InMemoryBackend::new(1);
        let res = sandbox("sbx-1");
        backend.create(&scope(), &res).await.unwrap();
        backend.get_status(&scope(), &res).await.unwrap();

        backend.start(&scope(), &res).await.unwrap();
        let state = backend.get_status(&scope(), &res).await.unwrap();
        assert_eq!(state.status, ResourceStatus::Running);
    }

    #[tokio::test]
    async fn stop_start_cycle() {
        let backend = InMemoryBackend::new(1);
        let res = sandbox("sbx-1");
        backend.create(&scope(), &res).await.unwrap();
        backend.get_status(&scope(), &res).await.unwrap();

        backend.stop(&scope(), &res).await.unwrap();
        assert_eq!(
            backend.get_status(&scope(), &res).await.unwrap().status,
            ResourceStatus::Stopped
        );

        backend.start(&scope(), &res).await.unwrap();
        assert_eq!(
            backend.get_status(&scope(), &res).await.unwrap().status,
            ResourceStatus::Running
        );
    }

    #[tokio::test]
    async fn delete_converges_to_terminated_even_when_absent() {
        let backend = InMemoryBackend::new(1);
        let res = sandbox("ghost");

        backend.delete(&scope(), &res).await.unwrap();
        let state = backend.get_status(&scope(), &res).await.unwrap();
        assert_eq!(state.status, ResourceStatus::Terminated);
    }

    #[tokio::test]
    async fn start_on_unknown_workload_is_permanent() {
        let backend = InMemoryBackend::default();
        let err = backend.start(&scope(), &sandbox("ghost")).await.unwrap_err();
        assert_matches!(err, BackendError::Permanent(_));
    }

    #[tokio::test]
    async fn injected_failures_apply_until_cleared() {
        let backend = InMemoryBackend::default();
        let res = sandbox("sbx-1");
        backend.fail_with("sbx-1", FailureMode::Transient);

        let err = backend.create(&scope(), &res).await.unwrap_err();
        assert!(err.is_transient());

        backend.clear_failure("sbx-1");
        backend.create(&scope(), &res).await.unwrap();
    }
}
