//! Repository for the `resources` table.
//!
//! This is the single mutation path for the engine's only shared mutable
//! state: `status_id` and `locked_until`. The scheduler claims rows through
//! [`ResourceRepo::claim_batch`], listeners advance them through the
//! `update_status` family, and the excluded CRUD layer requests transitions
//! through [`ResourceRepo::request_transition`]. Nothing else reads-then-
//! writes these columns.

use std::time::Duration;

use sqlx::PgPool;

use croft_core::state_machine;
use croft_core::status::{Intent, ResourceKind, ResourceStatus};
use croft_core::types::DbId;

use crate::models::resource::Resource;
use crate::repositories::ProjectRepo;

/// Column list for `resources` queries.
const COLUMNS: &str = "\
    id, project_id, owner_id, kind_id, name, namespace, status_id, \
    locked_until, retry_intent_id, connection_info, created_at, updated_at";

/// Errors surfaced by [`ResourceRepo::request_transition`].
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error("Resource not found: {0}")]
    NotFound(DbId),

    #[error("{0}")]
    Invalid(String),

    #[error("Resource was updated concurrently, retry the request")]
    Conflict,
}

/// Provides all reads and writes for cluster-backed resource rows.
pub struct ResourceRepo;

impl ResourceRepo {
    /// Insert a new resource row (status CREATING, lease unset).
    ///
    /// Takes any executor so [`ProjectRepo::create`] can insert the
    /// project's children inside its transaction.
    pub async fn insert<'e, E>(
        executor: E,
        project_id: DbId,
        owner_id: DbId,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<Resource, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO resources (project_id, owner_id, kind_id, name, namespace, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Resource>(&query)
            .bind(project_id)
            .bind(owner_id)
            .bind(kind.id())
            .bind(name)
            .bind(namespace)
            .bind(ResourceStatus::Creating.id())
            .fetch_one(executor)
            .await
    }

    /// Find a resource by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Resource>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM resources WHERE id = $1");
        sqlx::query_as::<_, Resource>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all resources owned by a project, oldest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Resource>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM resources WHERE project_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, Resource>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Atomically claim up to `limit` due rows of one kind and lease them
    /// for `lease` from now.
    ///
    /// Selection and lease write happen in a single conditional UPDATE over a
    /// `FOR UPDATE SKIP LOCKED` sub-select, so two concurrent callers can
    /// never both claim the same row; exclusivity is correctness here, not
    /// an optimisation. A row is eligible iff its status has work pending
    /// (see [`state_machine::DUE_STATUSES`]) and its lease is unset or
    /// lapsed. Returning fewer rows than `limit` is normal contention, not
    /// an error.
    pub async fn claim_batch(
        pool: &PgPool,
        kind: ResourceKind,
        limit: i64,
        lease: Duration,
    ) -> Result<Vec<Resource>, sqlx::Error> {
        let due: Vec<i16> = state_machine::DUE_STATUSES.iter().map(|s| s.id()).collect();
        let query = format!(
            "UPDATE resources \
             SET locked_until = NOW() + make_interval(secs => $3) \
             WHERE id IN ( \
                 SELECT id FROM resources \
                 WHERE kind_id = $1 \
                   AND status_id = ANY($2) \
                   AND (locked_until IS NULL OR locked_until < NOW()) \
                 ORDER BY updated_at ASC \
                 LIMIT $4 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Resource>(&query)
            .bind(kind.id())
            .bind(&due)
            .bind(lease.as_secs_f64())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Write a new status and, when `release_lease`, clear the lease.
    ///
    /// The absorbing TERMINATED state is guarded in SQL: a terminated row is
    /// never updated and the call returns `false`. Every successful write
    /// re-aggregates the owning project's status.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        new_status: ResourceStatus,
        release_lease: bool,
    ) -> Result<bool, sqlx::Error> {
        let project_id: Option<(DbId,)> = sqlx::query_as(
            "UPDATE resources \
             SET status_id = $2, \
                 retry_intent_id = NULL, \
                 locked_until = CASE WHEN $3 THEN NULL ELSE locked_until END \
             WHERE id = $1 AND status_id <> $4 \
             RETURNING project_id",
        )
        .bind(id)
        .bind(new_status.id())
        .bind(release_lease)
        .bind(ResourceStatus::Terminated.id())
        .fetch_optional(pool)
        .await?;

        Self::finish_update(pool, id, new_status, project_id).await
    }

    /// Advance a resource to RUNNING, writing its connection metadata in the
    /// same statement and releasing the lease.
    pub async fn mark_running(
        pool: &PgPool,
        id: DbId,
        connection_info: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let project_id: Option<(DbId,)> = sqlx::query_as(
            "UPDATE resources \
             SET status_id = $2, \
                 connection_info = $3, \
                 retry_intent_id = NULL, \
                 locked_until = NULL \
             WHERE id = $1 AND status_id <> $4 \
             RETURNING project_id",
        )
        .bind(id)
        .bind(ResourceStatus::Running.id())
        .bind(connection_info)
        .bind(ResourceStatus::Terminated.id())
        .fetch_optional(pool)
        .await?;

        Self::finish_update(pool, id, ResourceStatus::Running, project_id).await
    }

    /// Mark a resource ERROR, recording the intent to retry and re-arming the
    /// lease as the retry backoff gate: the row stays ineligible for claiming
    /// until `backoff` lapses, then a later tick re-emits `retry_intent`.
    pub async fn mark_error(
        pool: &PgPool,
        id: DbId,
        retry_intent: Intent,
        backoff: Duration,
    ) -> Result<bool, sqlx::Error> {
        let project_id: Option<(DbId,)> = sqlx::query_as(
            "UPDATE resources \
             SET status_id = $2, \
                 retry_intent_id = $3, \
                 locked_until = NOW() + make_interval(secs => $4) \
             WHERE id = $1 AND status_id <> $5 \
             RETURNING project_id",
        )
        .bind(id)
        .bind(ResourceStatus::Error.id())
        .bind(retry_intent.id())
        .bind(backoff.as_secs_f64())
        .bind(ResourceStatus::Terminated.id())
        .fetch_optional(pool)
        .await?;

        Self::finish_update(pool, id, ResourceStatus::Error, project_id).await
    }

    /// Release a lease without touching the status (a no-op poll: the
    /// backend is not ready yet). Does not re-aggregate the project.
    pub async fn release_lease(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE resources SET locked_until = NULL WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Desired-state entry point for the excluded CRUD layer: flip a row's
    /// status to STARTING / STOPPING / TERMINATING so the next tick picks up
    /// the transition.
    ///
    /// The flip is validated against the state machine and written as a
    /// compare-and-swap on the current status so it cannot race the engine's
    /// own writes.
    pub async fn request_transition(
        pool: &PgPool,
        id: DbId,
        to: ResourceStatus,
    ) -> Result<Resource, TransitionError> {
        if !matches!(
            to,
            ResourceStatus::Starting | ResourceStatus::Stopping | ResourceStatus::Terminating
        ) {
            return Err(TransitionError::Invalid(format!(
                "Requested status must be starting, stopping, or terminating, got {}",
                to.name()
            )));
        }

        let row = Self::find_by_id(pool, id)
            .await?
            .ok_or(TransitionError::NotFound(id))?;
        let from = row
            .status()
            .ok_or_else(|| TransitionError::Invalid(format!("Unknown status id {}", row.status_id)))?;

        // STARTING is also the engine's own forward edge out of CREATING;
        // accepting it there would skip the backend create entirely. An
        // external start applies only to a stopped or errored resource.
        if to == ResourceStatus::Starting
            && !matches!(from, ResourceStatus::Stopped | ResourceStatus::Error)
        {
            return Err(TransitionError::Invalid(format!(
                "Cannot request start from {}: only a stopped or errored resource can be started",
                from.name()
            )));
        }

        state_machine::validate_transition(from, to)
            .map_err(|e| TransitionError::Invalid(e.to_string()))?;

        let updated: Option<(DbId,)> = sqlx::query_as(
            "UPDATE resources \
             SET status_id = $2, retry_intent_id = NULL \
             WHERE id = $1 AND status_id = $3 \
             RETURNING project_id",
        )
        .bind(id)
        .bind(to.id())
        .bind(from.id())
        .fetch_optional(pool)
        .await?;

        let (project_id,) = updated.ok_or(TransitionError::Conflict)?;
        ProjectRepo::reconcile_status(pool, project_id).await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(TransitionError::NotFound(id))
    }

    /// Shared tail of every status write: log, then re-aggregate the owning
    /// project. `project_id` is `None` when the guard rejected the update
    /// (row missing or terminated).
    async fn finish_update(
        pool: &PgPool,
        id: DbId,
        new_status: ResourceStatus,
        project_id: Option<(DbId,)>,
    ) -> Result<bool, sqlx::Error> {
        match project_id {
            Some((project_id,)) => {
                tracing::debug!(
                    resource_id = id,
                    status = new_status.name(),
                    "Resource status updated"
                );
                ProjectRepo::reconcile_status(pool, project_id).await?;
                Ok(true)
            }
            None => {
                tracing::warn!(
                    resource_id = id,
                    status = new_status.name(),
                    "Status update skipped: row missing or terminated"
                );
                Ok(false)
            }
        }
    }
}
