//! Project repository for database operations

use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use super::query::{PROJECT_COLUMNS, ProjectQuery, update_query};
use crate::{
    error::{RepositoryError, RepositoryResult},
    models::{
        filters::{Pagination, ProjectFilters},
        project::{
            DifficultyLevel, NewProject, Project, ProjectListResponse, ProjectStats,
            ProjectStatus, StatusTally, UpdateProject,
        },
    },
};

const PROJECT_NOT_FOUND: &str = "Project not found";

/// Result of seeding the development dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The catalogue already had rows, nothing was written
    AlreadySeeded { count: i64 },
    Seeded { projects_created: usize },
}

/// Project repository for database operations
#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    /// Create a new project repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List live projects matching `filters`, one page at a time
    ///
    /// `is_favorite` reflects `viewer`'s likes and is false without a viewer.
    pub async fn list(
        &self,
        filters: &ProjectFilters,
        pagination: Pagination,
        viewer: Option<Uuid>,
    ) -> RepositoryResult<ProjectListResponse> {
        let pagination = Pagination::new(pagination.page, pagination.limit)
            .map_err(RepositoryError::InvalidArgument)?;
        let query = ProjectQuery::new(filters);

        let mut count = query.count_query();
        let mut page = query.page_query(viewer, pagination);
        debug!(sql = page.sql(), "Listing projects");

        let mut conn = self.pool.acquire().await?;
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
        let rows = page.build().fetch_all(&mut *conn).await?;

        let projects = rows
            .iter()
            .map(project_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProjectListResponse {
            projects,
            total,
            page: pagination.page,
            limit: pagination.limit,
            has_more: pagination.has_more(total),
        })
    }

    /// Get a live project by ID
    pub async fn get(&self, id: Uuid, viewer: Option<Uuid>) -> RepositoryResult<Project> {
        let row = ProjectQuery::by_id(id)
            .select_query(viewer)
            .build()
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(project_from_row(&row)?),
            None => Err(RepositoryError::NotFound(PROJECT_NOT_FOUND.to_string())),
        }
    }

    /// Create a new project, filling in slug, status, duration and tags
    pub async fn create(&self, payload: &NewProject) -> RepositoryResult<Project> {
        let mut conn = self.pool.acquire().await?;
        let project = insert_project(&mut *conn, payload).await?;

        info!(project_id = %project.id, slug = %project.slug, "Created project");
        Ok(project)
    }

    /// Patch the supplied fields of a live project and stamp `updated_at`
    pub async fn update(&self, id: Uuid, patch: &UpdateProject) -> RepositoryResult<Project> {
        if patch.is_empty() {
            return Err(RepositoryError::InvalidArgument(
                "No valid fields to update".to_string(),
            ));
        }
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(RepositoryError::InvalidArgument(
                "Project name cannot be empty".to_string(),
            ));
        }
        if patch
            .details
            .slug
            .as_deref()
            .is_some_and(|slug| slug.trim().is_empty())
        {
            return Err(RepositoryError::InvalidArgument(
                "Project slug cannot be empty".to_string(),
            ));
        }

        let row = update_query(id, patch)
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        match row {
            Some(row) => {
                let project = project_from_row(&row)?;
                info!(project_id = %id, "Updated project");
                Ok(project)
            }
            None => Err(RepositoryError::NotFound(PROJECT_NOT_FOUND.to_string())),
        }
    }

    /// Mark a live project as deleted; it disappears from every read
    pub async fn soft_delete(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(PROJECT_NOT_FOUND.to_string()));
        }

        info!(project_id = %id, "Soft deleted project");
        Ok(())
    }

    /// Flip `user_id`'s like on a project and return the new state
    ///
    /// The delete-or-insert happens in one statement, so concurrent toggles
    /// never produce duplicate likes. When a concurrent toggle inserted the
    /// same like first, the project is reported as liked.
    pub async fn toggle_favorite(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<bool> {
        let mut tx = self.pool.begin().await?;
        ensure_live(&mut *tx, project_id).await?;

        let is_favorite: bool = sqlx::query_scalar(
            r#"
            WITH removed AS (
                DELETE FROM project_likes
                WHERE project_id = $1 AND user_id = $2
                RETURNING 1
            ),
            added AS (
                INSERT INTO project_likes (project_id, user_id)
                SELECT $1, $2
                WHERE NOT EXISTS (SELECT 1 FROM removed)
                ON CONFLICT (project_id, user_id) DO NOTHING
                RETURNING 1
            )
            SELECT EXISTS (SELECT 1 FROM added) OR NOT EXISTS (SELECT 1 FROM removed)
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        tx.commit().await?;

        info!(%project_id, %user_id, is_favorite, "Toggled favorite");
        Ok(is_favorite)
    }

    /// Record that `user_id` viewed a project; repeated views are no-ops
    pub async fn increment_view_count(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        ensure_live(&mut *tx, project_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO project_views (project_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (project_id, user_id) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        tx.commit().await?;

        debug!(
            %project_id,
            %user_id,
            recorded = result.rows_affected() > 0,
            "Recorded project view"
        );
        Ok(())
    }

    /// Aggregate statistics over live projects, optionally for one organization
    pub async fn stats(&self, organization_id: Option<Uuid>) -> RepositoryResult<ProjectStats> {
        let row = ProjectQuery::scoped(organization_id)
            .stats_query()
            .build()
            .fetch_one(&self.pool)
            .await?;

        let tally = StatusTally {
            draft: row.try_get("draft")?,
            in_progress: row.try_get("in_progress")?,
            review: row.try_get("review")?,
            approved: row.try_get("approved")?,
            published: row.try_get("published")?,
            archived: row.try_get("archived")?,
        };

        Ok(ProjectStats {
            total_duration: row.try_get("total_duration")?,
            total_views: row.try_get("total_views")?,
            total_likes: row.try_get("total_likes")?,
            ..ProjectStats::new(row.try_get("total")?, tally)
        })
    }

    /// Insert a demo user and two sample projects into an empty catalogue
    pub async fn seed_sample_data(&self) -> RepositoryResult<SeedOutcome> {
        let mut tx = self.pool.begin().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            return Ok(SeedOutcome::AlreadySeeded { count });
        }

        let user_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, display_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE SET updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind("testuser")
        .bind("test@example.com")
        .bind("Test User")
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        let samples = sample_projects(user_id);
        for sample in &samples {
            insert_project(&mut *tx, sample).await?;
        }

        tx.commit().await?;

        info!(%user_id, projects = samples.len(), "Seeded sample data");
        Ok(SeedOutcome::Seeded {
            projects_created: samples.len(),
        })
    }
}

/// Insert a project and read it back with its author columns
async fn insert_project(
    conn: &mut PgConnection,
    payload: &NewProject,
) -> RepositoryResult<Project> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(RepositoryError::InvalidArgument(
            "Project name cannot be empty".to_string(),
        ));
    }
    let slug = payload.slug();
    if slug.is_empty() {
        return Err(RepositoryError::InvalidArgument(format!(
            "Cannot derive a slug from project name '{name}'"
        )));
    }

    let d = &payload.details;
    let sql = format!(
        r#"
        WITH written AS (
            INSERT INTO projects (
                name, slug, description, status, duration_seconds,
                resolution_width, resolution_height, frame_rate,
                difficulty_level, estimated_hours, tags, thumbnail_url,
                created_by, organization_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
        )
        SELECT {PROJECT_COLUMNS}, FALSE AS is_favorite
        FROM written p LEFT JOIN users u ON u.id = p.created_by
        "#
    );

    let row = sqlx::query(&sql)
        .bind(name)
        .bind(slug.as_str())
        .bind(d.description.as_deref())
        .bind(payload.status().as_db_str())
        .bind(payload.duration_seconds())
        .bind(d.resolution_width)
        .bind(d.resolution_height)
        .bind(d.frame_rate)
        .bind(d.difficulty_level.map(DifficultyLevel::as_str))
        .bind(d.estimated_hours)
        .bind(payload.tags())
        .bind(d.thumbnail_url.as_deref())
        .bind(payload.created_by)
        .bind(d.organization_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(RepositoryError::from_write)?;

    Ok(project_from_row(&row)?)
}

/// Lock a live project against concurrent deletion for the rest of the
/// transaction
async fn ensure_live(conn: &mut PgConnection, project_id: Uuid) -> RepositoryResult<()> {
    let live: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM projects WHERE id = $1 AND deleted_at IS NULL FOR SHARE",
    )
    .bind(project_id)
    .fetch_optional(&mut *conn)
    .await?;

    match live {
        Some(_) => Ok(()),
        None => Err(RepositoryError::NotFound(PROJECT_NOT_FOUND.to_string())),
    }
}

fn project_from_row(row: &PgRow) -> Result<Project, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<ProjectStatus>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;

    let difficulty_level = row
        .try_get::<Option<String>, _>("difficulty_level")?
        .map(|level| level.parse::<DifficultyLevel>())
        .transpose()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "difficulty_level".to_string(),
            source: e.into(),
        })?;

    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        status,
        duration_seconds: row.try_get("duration_seconds")?,
        resolution_width: row.try_get("resolution_width")?,
        resolution_height: row.try_get("resolution_height")?,
        frame_rate: row.try_get("frame_rate")?,
        difficulty_level,
        estimated_hours: row.try_get("estimated_hours")?,
        tags: row.try_get("tags")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        created_by: row.try_get("created_by")?,
        author_name: row.try_get("author_name")?,
        author_username: row.try_get("author_username")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
        organization_id: row.try_get("organization_id")?,
        is_favorite: row.try_get("is_favorite")?,
    })
}

fn sample_projects(user_id: Uuid) -> Vec<NewProject> {
    let mut first = NewProject::new("Sample Video Project 1", user_id);
    first.details.description = Some("A sample video editing project for testing".to_string());
    first.details.status = Some(ProjectStatus::Draft);
    first.details.duration_seconds = Some(120.0);
    first.details.resolution_width = Some(1920);
    first.details.resolution_height = Some(1080);
    first.details.frame_rate = Some(30.0);
    first.details.difficulty_level = Some(DifficultyLevel::Beginner);
    first.details.tags = Some(vec!["sample".into(), "test".into(), "video".into()]);

    let mut second = NewProject::new("Sample Video Project 2", user_id);
    second.details.description = Some("Another sample project for testing".to_string());
    second.details.status = Some(ProjectStatus::Published);
    second.details.duration_seconds = Some(180.0);
    second.details.resolution_width = Some(1280);
    second.details.resolution_height = Some(720);
    second.details.frame_rate = Some(24.0);
    second.details.difficulty_level = Some(DifficultyLevel::Intermediate);
    second.details.tags = Some(vec!["sample".into(), "test".into(), "completed".into()]);

    vec![first, second]
}
