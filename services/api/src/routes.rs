//! API service routes

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{
        filters::{ProjectListQuery, StatsQuery, ViewerQuery},
        project::{CreateProjectRequest, FavoriteResponse, UpdateProject, ViewerRequest},
    },
    repositories::SeedOutcome,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/seed", post(seed_database))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/stats", get(project_stats))
        .route(
            "/projects/:id",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/:id/favorite", post(toggle_favorite))
        .route("/projects/:id/view", post(record_view))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
///
/// Reports 503 when the database cannot answer a trivial query.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_healthy = match state.database.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            warn!("Database health check failed: {}", e);
            false
        }
    };

    let (status, service_status, database_status) = if database_healthy {
        (StatusCode::OK, "ok", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
    };

    (
        status,
        Json(json!({
            "status": service_status,
            "service": "api-service",
            "database": database_status,
        })),
    )
}

/// List projects with filters and pagination
pub async fn list_projects(
    State(state): State<AppState>,
    query: Result<Query<ProjectListQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = query?;
    let request = params.parse().map_err(ApiError::BadRequest)?;

    let page = state
        .project_repository
        .list(&request.filters, request.pagination, request.viewer)
        .await
        .map_err(|e| ApiError::from_repository(e, "Failed to fetch projects"))?;

    Ok(Json(page))
}

/// Create a new project
pub async fn create_project(
    State(state): State<AppState>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let new_project = payload.into_new_project().map_err(ApiError::BadRequest)?;

    let project = state
        .project_repository
        .create(&new_project)
        .await
        .map_err(|e| ApiError::from_repository(e, "Failed to create project"))?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// Aggregate statistics over live projects
pub async fn project_stats(
    State(state): State<AppState>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = query?;
    let organization_id = params.organization_id().map_err(ApiError::BadRequest)?;

    let stats = state
        .project_repository
        .stats(organization_id)
        .await
        .map_err(|e| ApiError::from_repository(e, "Failed to fetch project statistics"))?;

    Ok(Json(stats))
}

/// Get a project by ID
pub async fn get_project(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ViewerQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Query(params) = query?;
    let viewer = params.viewer().map_err(ApiError::BadRequest)?;

    let project = state
        .project_repository
        .get(id, viewer)
        .await
        .map_err(|e| ApiError::from_repository(e, "Failed to fetch project"))?;

    Ok(Json(project))
}

/// Partially update a project
pub async fn update_project(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProject>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(patch) = payload?;

    let project = state
        .project_repository
        .update(id, &patch)
        .await
        .map_err(|e| ApiError::from_repository(e, "Failed to update project"))?;

    Ok(Json(project))
}

/// Soft delete a project
pub async fn delete_project(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;

    state
        .project_repository
        .soft_delete(id)
        .await
        .map_err(|e| ApiError::from_repository(e, "Failed to delete project"))?;

    Ok(Json(json!({ "message": "Project deleted successfully" })))
}

/// Toggle the acting user's favorite on a project
pub async fn toggle_favorite(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ViewerRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let user_id = acting_user(payload?)?;

    let is_favorite = state
        .project_repository
        .toggle_favorite(id, user_id)
        .await
        .map_err(|e| ApiError::from_repository(e, "Failed to toggle favorite"))?;

    Ok(Json(FavoriteResponse { is_favorite }))
}

/// Record a view of a project by the acting user
pub async fn record_view(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ViewerRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let user_id = acting_user(payload?)?;

    state
        .project_repository
        .increment_view_count(id, user_id)
        .await
        .map_err(|e| ApiError::from_repository(e, "Failed to increment view count"))?;

    Ok(Json(json!({ "message": "View count incremented" })))
}

/// Insert development sample data into an empty catalogue
pub async fn seed_database(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .project_repository
        .seed_sample_data()
        .await
        .map_err(|e| ApiError::from_repository(e, "Failed to seed database"))?;

    let body = match outcome {
        SeedOutcome::AlreadySeeded { count } => json!({
            "message": "Database already has data",
            "count": count,
        }),
        SeedOutcome::Seeded { projects_created } => json!({
            "message": "Sample data inserted successfully",
            "userCreated": true,
            "projectsCreated": projects_created,
        }),
    };

    Ok(Json(body))
}

fn acting_user(Json(request): Json<ViewerRequest>) -> ApiResult<Uuid> {
    request
        .user_id
        .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))
}
