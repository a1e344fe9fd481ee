//! Custom error types for the API service

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failure of a repository operation
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The target row is missing or soft-deleted
    #[error("{0}")]
    NotFound(String),

    /// The request can never succeed as given
    #[error("{0}")]
    InvalidArgument(String),

    /// Connectivity or query execution failure, passed through unchanged
    #[error("Persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Classify a failed write
    ///
    /// Constraint violations are caused by the payload, so they become
    /// `InvalidArgument`; everything else stays a persistence failure.
    pub fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            if db_err.is_unique_violation() {
                return RepositoryError::InvalidArgument(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
            if db_err.is_foreign_key_violation() {
                return RepositoryError::InvalidArgument(format!(
                    "Referenced row does not exist: {constraint}"
                ));
            }
            if db_err.is_check_violation() {
                return RepositoryError::InvalidArgument(format!(
                    "Value rejected by check constraint: {constraint}"
                ));
            }
        }
        RepositoryError::Persistence(err)
    }
}

/// Type alias for repository results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing resource with message
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error with a message safe to show to clients
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Map a repository failure, using `context` as the client-facing
    /// message when the store itself failed
    pub fn from_repository(err: RepositoryError, context: &str) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ApiError::NotFound(msg),
            RepositoryError::InvalidArgument(msg) => {
                warn!("{}: {}", context, msg);
                ApiError::BadRequest(msg)
            }
            RepositoryError::Persistence(e) => {
                error!("{}: {}", context, e);
                ApiError::Internal(context.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
