//! Repository for the `projects` table, including the status aggregator's
//! single write path.

use sqlx::PgPool;
use uuid::Uuid;

use croft_core::aggregate::aggregate;
use croft_core::status::{ProjectStatus, ResourceKind, ResourceStatus, StatusId};
use croft_core::types::DbId;

use crate::models::project::{CreateProject, Project, ProvisionedProject};
use crate::repositories::ResourceRepo;

/// Column list for `projects` queries.
const COLUMNS: &str = "id, owner_id, name, namespace, status_id, created_at, updated_at";

/// Provides CRUD for projects and the derived-status reconciliation.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Create a project and its development environment in one transaction:
    /// the project row plus one CREATING resource per kind. The scheduler
    /// picks the children up on its next tick.
    pub async fn create(
        pool: &PgPool,
        input: &CreateProject,
    ) -> Result<ProvisionedProject, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO projects (owner_id, name, namespace, status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(input.owner_id)
            .bind(&input.name)
            .bind(&input.namespace)
            .bind(ProjectStatus::Creating.id())
            .fetch_one(&mut *tx)
            .await?;

        let mut resources = Vec::with_capacity(ResourceKind::ALL.len());
        for kind in ResourceKind::ALL {
            let name = cluster_name(&input.name, kind);
            let resource = ResourceRepo::insert(
                &mut *tx,
                project.id,
                input.owner_id,
                kind,
                &name,
                &input.namespace,
            )
            .await?;
            resources.push(resource);
        }

        tx.commit().await?;

        tracing::info!(
            project_id = project.id,
            namespace = %project.namespace,
            "Project environment provisioned in desired-state store"
        );

        Ok(ProvisionedProject { project, resources })
    }

    /// Find a project by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Re-read a project's child resource statuses, aggregate them, and
    /// persist the result: the single writer of `projects.status_id`.
    ///
    /// Runs inside a transaction that locks the project row first, so
    /// concurrent child updates aggregate one after the other. Without the
    /// lock, two interleaved calls can each read before the other's child
    /// write and the later UPDATE persists a stale aggregate that nothing
    /// re-reconciles.
    ///
    /// Persists only when the aggregate differs from the stored value so
    /// steady-state reconciliation produces no redundant writes. Returns the
    /// new status when it changed, `None` otherwise.
    pub async fn reconcile_status(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Option<ProjectStatus>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked: Option<(DbId,)> =
            sqlx::query_as("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
                .bind(project_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tracing::warn!(project_id, "Skipping reconcile for missing project");
            return Ok(None);
        }

        let status_ids: Vec<(StatusId,)> =
            sqlx::query_as("SELECT status_id FROM resources WHERE project_id = $1")
                .bind(project_id)
                .fetch_all(&mut *tx)
                .await?;

        let children: Vec<ResourceStatus> = status_ids
            .iter()
            .filter_map(|(id,)| {
                let status = ResourceStatus::from_id(*id);
                if status.is_none() {
                    tracing::warn!(project_id, status_id = id, "Skipping unknown resource status");
                }
                status
            })
            .collect();

        let next = aggregate(&children);

        let updated = sqlx::query("UPDATE projects SET status_id = $2 WHERE id = $1 AND status_id <> $2")
            .bind(project_id)
            .bind(next.id())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if updated.rows_affected() > 0 {
            tracing::info!(project_id, status = ?next, "Project status reconciled");
            Ok(Some(next))
        } else {
            Ok(None)
        }
    }
}

/// Cluster-facing workload name: project slug, kind marker, uuid-v7 suffix
/// for uniqueness within the namespace.
fn cluster_name(project_name: &str, kind: ResourceKind) -> String {
    let slug: String = project_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    let marker = match kind {
        ResourceKind::Sandbox => "sbx",
        ResourceKind::Database => "db",
    };
    // Trailing chars of the v7 uuid are the random bits; the leading ones
    // are the timestamp and repeat across names minted close together.
    let suffix = Uuid::now_v7().simple().to_string();
    format!("{slug}-{marker}-{}", &suffix[suffix.len() - 8..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_name_is_slugged_and_marked() {
        let name = cluster_name("My App 2", ResourceKind::Sandbox);
        assert!(name.starts_with("my-app-2-sbx-"));
        let name = cluster_name("My App 2", ResourceKind::Database);
        assert!(name.starts_with("my-app-2-db-"));
    }

    #[test]
    fn cluster_name_suffix_is_unique() {
        let a = cluster_name("proj", ResourceKind::Sandbox);
        let b = cluster_name("proj", ResourceKind::Sandbox);
        assert_ne!(a, b);
    }

    #[test]
    fn cluster_name_trims_leading_and_trailing_dashes() {
        let name = cluster_name("  padded  ", ResourceKind::Sandbox);
        assert!(name.starts_with("padded-sbx-"));
    }
}
