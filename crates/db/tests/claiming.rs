//! Lease claiming: exclusivity, expiry, and eligibility.

use std::collections::HashSet;
use std::time::Duration;

use sqlx::PgPool;

use croft_core::status::{ResourceKind, ResourceStatus};
use croft_db::models::{CreateProject, ProvisionedProject};
use croft_db::repositories::{ProjectRepo, ResourceRepo};

const LEASE: Duration = Duration::from_secs(60);

async fn seed_project(pool: &PgPool, name: &str) -> ProvisionedProject {
    ProjectRepo::create(
        pool,
        &CreateProject {
            name: name.to_string(),
            owner_id: 1,
            namespace: format!("ns-{name}"),
        },
    )
    .await
    .expect("project should be created")
}

#[sqlx::test]
async fn claim_leases_due_rows_of_one_kind(pool: PgPool) {
    let env = seed_project(&pool, "alpha").await;

    let claimed = ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 10, LEASE)
        .await
        .unwrap();

    // Only the sandbox; the database child belongs to the other tick loop.
    assert_eq!(claimed.len(), 1);
    let row = &claimed[0];
    assert_eq!(row.kind(), Some(ResourceKind::Sandbox));
    assert_eq!(row.project_id, env.project.id);
    assert!(row.locked_until.expect("lease should be set") > chrono::Utc::now());
}

#[sqlx::test]
async fn leased_rows_are_not_reclaimable(pool: PgPool) {
    seed_project(&pool, "alpha").await;

    let first = ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 10, LEASE)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    let second = ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 10, LEASE)
        .await
        .unwrap();
    assert!(second.is_empty(), "an unexpired lease must block re-claiming");
}

#[sqlx::test]
async fn expired_lease_is_reclaimable(pool: PgPool) {
    let env = seed_project(&pool, "alpha").await;
    let sandbox_id = env.resources[0].id;

    let first = ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 10, LEASE)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    // Simulate a crashed worker: the lease lapses without a status write.
    sqlx::query("UPDATE resources SET locked_until = NOW() - INTERVAL '1 second' WHERE id = $1")
        .bind(sandbox_id)
        .execute(&pool)
        .await
        .unwrap();

    let second = ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 10, LEASE)
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, sandbox_id);
}

#[sqlx::test]
async fn unexpired_lease_blocks_regardless_of_status(pool: PgPool) {
    let env = seed_project(&pool, "alpha").await;
    let sandbox_id = env.resources[0].id;

    // An error row inside its backoff window is due by status but leased.
    sqlx::query(
        "UPDATE resources \
         SET status_id = $2, locked_until = NOW() + INTERVAL '30 seconds' \
         WHERE id = $1",
    )
    .bind(sandbox_id)
    .bind(ResourceStatus::Error.id())
    .execute(&pool)
    .await
    .unwrap();

    let claimed = ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 10, LEASE)
        .await
        .unwrap();
    assert!(claimed.is_empty());
}

#[sqlx::test]
async fn steady_state_rows_are_never_claimed(pool: PgPool) {
    let env = seed_project(&pool, "alpha").await;
    let sandbox_id = env.resources[0].id;

    for steady in [ResourceStatus::Running, ResourceStatus::Stopped, ResourceStatus::Terminated] {
        sqlx::query("UPDATE resources SET status_id = $2, locked_until = NULL WHERE id = $1")
            .bind(sandbox_id)
            .bind(steady.id())
            .execute(&pool)
            .await
            .unwrap();

        let claimed = ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 10, LEASE)
            .await
            .unwrap();
        assert!(claimed.is_empty(), "{} must not be claimed", steady.name());
    }
}

#[sqlx::test]
async fn claim_respects_batch_limit(pool: PgPool) {
    for i in 0..3 {
        seed_project(&pool, &format!("proj-{i}")).await;
    }

    let claimed = ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 2, LEASE)
        .await
        .unwrap();
    assert_eq!(claimed.len(), 2);

    // The remainder is picked up by the next tick.
    let rest = ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 2, LEASE)
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
}

#[sqlx::test]
async fn concurrent_claims_never_overlap(pool: PgPool) {
    for i in 0..4 {
        seed_project(&pool, &format!("proj-{i}")).await;
    }

    let a = tokio::spawn({
        let pool = pool.clone();
        async move { ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 4, LEASE).await }
    });
    let b = tokio::spawn({
        let pool = pool.clone();
        async move { ResourceRepo::claim_batch(&pool, ResourceKind::Sandbox, 4, LEASE).await }
    });

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    let ids_a: HashSet<_> = a.iter().map(|r| r.id).collect();
    let ids_b: HashSet<_> = b.iter().map(|r| r.id).collect();

    assert!(ids_a.is_disjoint(&ids_b), "two workers claimed the same row");
    assert_eq!(ids_a.len() + ids_b.len(), 4, "all due rows should be claimed exactly once");
}
