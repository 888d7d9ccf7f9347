//! Persistence for the mediaq coordinator.
//!
//! - [`models`] -- row structs and input DTOs for nodes, jobs and claim locks.
//! - [`repositories`] -- PostgreSQL queries, one repo per table.
//! - [`store`] -- the [`CoordinatorStore`] seam the coordinator is written against.
//! - [`pg_store`] / [`memory`] -- the two implementations of that seam.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod pg_store;
pub mod repositories;
pub mod store;

pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use store::{CoordinatorStore, StoreError};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
