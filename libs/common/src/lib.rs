//! Common library for the Kira project catalogue
//!
//! This crate provides shared functionality used by the services of the
//! workspace: database configuration, the connection pool resource manager
//! and the database error type.
//!
//! ```rust,no_run
//! use common::database::{Database, DatabaseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let database = Database::connect(&config).await?;
//!     println!("Database health check: {}", database.health_check().await?);
//!     database.close().await;
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
