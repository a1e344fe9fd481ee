//! Application state shared across handlers

use common::database::Database;

use crate::repositories::ProjectRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub project_repository: ProjectRepository,
}

impl AppState {
    /// Build the state around a single pool handle
    pub fn new(database: Database) -> Self {
        let project_repository = ProjectRepository::new(database.pool().clone());
        Self {
            database,
            project_repository,
        }
    }
}
