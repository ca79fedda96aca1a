//! Persistence layer for the croft reconciliation engine.
//!
//! Row models live in [`models`], typed table access in [`repositories`].
//! All repository methods are static async functions taking a [`DbPool`];
//! the only shared mutable state in the whole engine (resource `status_id`
//! and `locked_until`) is mutated exclusively through
//! [`repositories::ResourceRepo`].

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Embedded migrations, applied by the reconciler at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}
