//! Project status aggregation through the repository layer.

use std::time::Duration;

use sqlx::PgPool;

use croft_core::status::{Intent, ProjectStatus, ResourceStatus};
use croft_db::models::{CreateProject, ProvisionedProject};
use croft_db::repositories::{ProjectRepo, ResourceRepo};

async fn seed_project(pool: &PgPool) -> ProvisionedProject {
    ProjectRepo::create(
        pool,
        &CreateProject {
            name: "env".to_string(),
            owner_id: 7,
            namespace: "ns-env".to_string(),
        },
    )
    .await
    .expect("project should be created")
}

async fn project_status(pool: &PgPool, id: i64) -> ProjectStatus {
    ProjectRepo::find_by_id(pool, id)
        .await
        .unwrap()
        .unwrap()
        .status()
        .unwrap()
}

#[sqlx::test]
async fn new_project_is_creating_with_creating_children(pool: PgPool) {
    let env = seed_project(&pool).await;

    assert_eq!(env.resources.len(), 2);
    for r in &env.resources {
        assert_eq!(r.status(), Some(ResourceStatus::Creating));
        assert!(r.locked_until.is_none());
    }
    assert_eq!(project_status(&pool, env.project.id).await, ProjectStatus::Creating);
}

#[sqlx::test]
async fn bringup_scenario_follows_precedence(pool: PgPool) {
    let env = seed_project(&pool).await;
    let sandbox = env.resources[0].id;
    let database = env.resources[1].id;
    let info = serde_json::json!({});

    // Sandbox ready first: one RUNNING child does not outrank CREATING.
    ResourceRepo::mark_running(&pool, sandbox, &info).await.unwrap();
    assert_eq!(project_status(&pool, env.project.id).await, ProjectStatus::Creating);

    // Both ready.
    ResourceRepo::mark_running(&pool, database, &info).await.unwrap();
    assert_eq!(project_status(&pool, env.project.id).await, ProjectStatus::Running);

    // Sandbox fails during a stop request while the database stays up.
    ResourceRepo::mark_error(&pool, sandbox, Intent::Stop, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(project_status(&pool, env.project.id).await, ProjectStatus::Error);
}

#[sqlx::test]
async fn mixed_in_flight_starting_collapses(pool: PgPool) {
    let env = seed_project(&pool).await;
    let info = serde_json::json!({});

    ResourceRepo::mark_running(&pool, env.resources[0].id, &info).await.unwrap();
    ResourceRepo::update_status(&pool, env.resources[1].id, ResourceStatus::Starting, true)
        .await
        .unwrap();

    assert_eq!(project_status(&pool, env.project.id).await, ProjectStatus::Starting);
}

#[sqlx::test]
async fn irreconcilable_mix_is_partial(pool: PgPool) {
    let env = seed_project(&pool).await;

    // Force an inconsistent combination directly.
    sqlx::query("UPDATE resources SET status_id = $2 WHERE id = $1")
        .bind(env.resources[0].id)
        .bind(ResourceStatus::Running.id())
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE resources SET status_id = $2 WHERE id = $1")
        .bind(env.resources[1].id)
        .bind(ResourceStatus::Stopped.id())
        .execute(&pool)
        .await
        .unwrap();

    let changed = ProjectRepo::reconcile_status(&pool, env.project.id).await.unwrap();
    assert_eq!(changed, Some(ProjectStatus::Partial));
}

#[sqlx::test]
async fn concurrent_sibling_updates_never_leave_stale_aggregate(pool: PgPool) {
    // The sandbox and database listeners run on independent tasks, so both
    // children can finish at the same moment. Whichever aggregation runs
    // last must see both writes; the project may not stick at CREATING.
    for round in 0..5 {
        let env = ProjectRepo::create(
            &pool,
            &CreateProject {
                name: format!("env-{round}"),
                owner_id: 7,
                namespace: "ns-env".to_string(),
            },
        )
        .await
        .unwrap();

        let sandbox = env.resources[0].id;
        let database = env.resources[1].id;
        let (pool_a, pool_b) = (pool.clone(), pool.clone());

        let a = tokio::spawn(async move {
            ResourceRepo::mark_running(&pool_a, sandbox, &serde_json::json!({})).await
        });
        let b = tokio::spawn(async move {
            ResourceRepo::mark_running(&pool_b, database, &serde_json::json!({})).await
        });
        assert!(a.await.unwrap().unwrap());
        assert!(b.await.unwrap().unwrap());

        assert_eq!(
            project_status(&pool, env.project.id).await,
            ProjectStatus::Running,
            "round {round}"
        );
    }
}

#[sqlx::test]
async fn reconcile_persists_only_on_change(pool: PgPool) {
    let env = seed_project(&pool).await;

    // Children are CREATING and the project already is: nothing to write.
    let unchanged = ProjectRepo::reconcile_status(&pool, env.project.id).await.unwrap();
    assert_eq!(unchanged, None);

    let info = serde_json::json!({});
    ResourceRepo::mark_running(&pool, env.resources[0].id, &info).await.unwrap();
    ResourceRepo::mark_running(&pool, env.resources[1].id, &info).await.unwrap();
    assert_eq!(project_status(&pool, env.project.id).await, ProjectStatus::Running);

    let unchanged = ProjectRepo::reconcile_status(&pool, env.project.id).await.unwrap();
    assert_eq!(unchanged, None);
}
