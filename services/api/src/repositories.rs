//! Repositories for database operations

pub mod project;
pub mod query;

pub use project::{ProjectRepository, SeedOutcome};
