//! Project catalogue API
//!
//! HTTP routes over a Postgres-backed project repository. The binary in
//! `main.rs` wires configuration, the pool and the router together; the
//! library is exposed so integration tests can build the same router.

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod state;

use common::{database::Database, error::DatabaseError};
use sqlx::migrate::Migrator;

pub use state::AppState;

/// Migrations embedded from `services/api/migrations`
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply any pending migrations
pub async fn run_migrations(database: &Database) -> Result<(), DatabaseError> {
    MIGRATOR.run(database.pool()).await?;
    Ok(())
}
