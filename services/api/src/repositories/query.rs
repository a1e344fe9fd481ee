//! Typed predicate builder for project queries
//!
//! Filters are turned into a list of [`Predicate`] values once and then
//! rendered onto [`QueryBuilder`]s with bound placeholders. The count query
//! and the page query render the same list, so their WHERE clauses cannot
//! drift apart.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{
    filters::{Pagination, ProjectFilters, SortField, SortOrder},
    project::{DifficultyLevel, ProjectStatus, UpdateProject},
};

/// Projection shared by every query returning projects
///
/// Expects `projects` aliased as `p` and `users` as `u`.
pub const PROJECT_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.status, \
     p.duration_seconds, p.resolution_width, p.resolution_height, p.frame_rate, \
     p.difficulty_level, p.estimated_hours, p.tags, p.thumbnail_url, p.created_by, \
     u.display_name AS author_name, u.username AS author_username, \
     p.created_at, p.updated_at, p.deleted_at, p.organization_id";

const PROJECT_FROM: &str = " FROM projects p LEFT JOIN users u ON u.id = p.created_by";

/// Statuses reported as their own bucket by the stats query
pub const STATS_BUCKETS: [ProjectStatus; 6] = [
    ProjectStatus::Draft,
    ProjectStatus::InProgress,
    ProjectStatus::Review,
    ProjectStatus::Approved,
    ProjectStatus::Published,
    ProjectStatus::Archived,
];

/// A single condition on the `projects` table
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    NotDeleted,
    Id(Uuid),
    /// Case-insensitive substring over name, description and slug
    Search(String),
    Status(ProjectStatus),
    CreatedBy(Uuid),
    Organization(Uuid),
    Difficulty(DifficultyLevel),
    /// Row tags share at least one element with the given set
    TagsOverlap(Vec<String>),
    CreatedFrom(DateTime<Utc>),
    CreatedUntil(DateTime<Utc>),
}

impl Predicate {
    fn render(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Predicate::NotDeleted => {
                qb.push("p.deleted_at IS NULL");
            }
            Predicate::Id(id) => {
                qb.push("p.id = ").push_bind(*id);
            }
            Predicate::Search(term) => {
                let pattern = like_pattern(term);
                qb.push("(p.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR p.description ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR p.slug ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
            Predicate::Status(status) => {
                qb.push("p.status = ").push_bind(status.as_db_str());
            }
            Predicate::CreatedBy(user_id) => {
                qb.push("p.created_by = ").push_bind(*user_id);
            }
            Predicate::Organization(organization_id) => {
                qb.push("p.organization_id = ").push_bind(*organization_id);
            }
            Predicate::Difficulty(level) => {
                qb.push("p.difficulty_level = ").push_bind(level.as_str());
            }
            Predicate::TagsOverlap(tags) => {
                qb.push("p.tags && ").push_bind(tags.clone());
            }
            Predicate::CreatedFrom(start) => {
                qb.push("p.created_at >= ").push_bind(*start);
            }
            Predicate::CreatedUntil(end) => {
                qb.push("p.created_at <= ").push_bind(*end);
            }
        }
    }
}

/// Wrap a search term for `ILIKE`, matching `%`, `_` and `\` literally
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Predicates plus ordering for one logical project query
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectQuery {
    predicates: Vec<Predicate>,
    sort_by: SortField,
    sort_order: SortOrder,
}

impl ProjectQuery {
    /// Live projects matching the given filters
    pub fn new(filters: &ProjectFilters) -> Self {
        let mut predicates = vec![Predicate::NotDeleted];

        if let Some(search) = filters.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                predicates.push(Predicate::Search(search.to_string()));
            }
        }
        if let Some(status) = filters.status {
            predicates.push(Predicate::Status(status));
        }
        if let Some(user_id) = filters.created_by {
            predicates.push(Predicate::CreatedBy(user_id));
        }
        if let Some(organization_id) = filters.organization_id {
            predicates.push(Predicate::Organization(organization_id));
        }
        if let Some(level) = filters.difficulty_level {
            predicates.push(Predicate::Difficulty(level));
        }
        if !filters.tags.is_empty() {
            predicates.push(Predicate::TagsOverlap(filters.tags.clone()));
        }
        if let Some(range) = filters.date_range {
            if let Some(start) = range.start {
                predicates.push(Predicate::CreatedFrom(start));
            }
            if let Some(end) = range.end {
                predicates.push(Predicate::CreatedUntil(end));
            }
        }

        Self {
            predicates,
            sort_by: filters.sort_by,
            sort_order: filters.sort_order,
        }
    }

    /// A single live project
    pub fn by_id(id: Uuid) -> Self {
        Self {
            predicates: vec![Predicate::NotDeleted, Predicate::Id(id)],
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }

    /// Live projects, optionally limited to one organization
    pub fn scoped(organization_id: Option<Uuid>) -> Self {
        let mut predicates = vec![Predicate::NotDeleted];
        predicates.extend(organization_id.map(Predicate::Organization));
        Self {
            predicates,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" WHERE ");
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            predicate.render(qb);
        }
    }

    /// Total matching rows, ignoring pagination
    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM projects p");
        self.push_where(&mut qb);
        qb
    }

    /// Matching rows with author columns and the viewer's favorite flag
    pub fn select_query(&self, viewer: Option<Uuid>) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(PROJECT_COLUMNS).push(", ");
        match viewer {
            Some(user_id) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM project_likes pl \
                     WHERE pl.project_id = p.id AND pl.user_id = ",
                )
                .push_bind(user_id)
                .push(")");
            }
            None => {
                qb.push("FALSE");
            }
        }
        qb.push(" AS is_favorite").push(PROJECT_FROM);
        self.push_where(&mut qb);
        qb
    }

    /// One ordered page of matching rows
    pub fn page_query(
        &self,
        viewer: Option<Uuid>,
        pagination: Pagination,
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = self.select_query(viewer);
        let direction = self.sort_order.keyword();
        qb.push(" ORDER BY ")
            .push(self.sort_by.column())
            .push(" ")
            .push(direction)
            .push(", p.id ")
            .push(direction)
            .push(" LIMIT ")
            .push_bind(i64::from(pagination.limit))
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        qb
    }

    /// Per-status counts, summed duration and engagement totals
    pub fn stats_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) AS total");
        for status in STATS_BUCKETS {
            qb.push(", COUNT(*) FILTER (WHERE p.status = ")
                .push_bind(status.as_db_str())
                .push(") AS ")
                .push(status.as_str());
        }
        qb.push(
            ", COALESCE(SUM(p.duration_seconds), 0)::FLOAT8 AS total_duration\
             , COALESCE(SUM((SELECT COUNT(*) FROM project_views v WHERE v.project_id = p.id)), 0)::INT8 AS total_views\
             , COALESCE(SUM((SELECT COUNT(*) FROM project_likes l WHERE l.project_id = p.id)), 0)::INT8 AS total_likes\
             \x20FROM projects p",
        );
        self.push_where(&mut qb);
        qb
    }
}

/// Partial UPDATE of a live project returning the shared projection
///
/// Only supplied columns are assigned, each with its own bound placeholder.
/// No row comes back when the project is missing or deleted.
pub fn update_query(id: Uuid, patch: &UpdateProject) -> QueryBuilder<'static, Postgres> {
    let d = &patch.details;
    let mut qb = QueryBuilder::new("WITH written AS (UPDATE projects SET ");
    let mut set = qb.separated(", ");

    if let Some(name) = &patch.name {
        set.push("name = ").push_bind_unseparated(name.trim().to_string());
    }
    if let Some(slug) = &d.slug {
        set.push("slug = ").push_bind_unseparated(slug.trim().to_string());
    }
    if let Some(description) = &d.description {
        set.push("description = ").push_bind_unseparated(description.clone());
    }
    if let Some(status) = d.status {
        set.push("status = ").push_bind_unseparated(status.as_db_str());
    }
    if let Some(duration) = d.duration_seconds {
        set.push("duration_seconds = ").push_bind_unseparated(duration);
    }
    if let Some(width) = d.resolution_width {
        set.push("resolution_width = ").push_bind_unseparated(width);
    }
    if let Some(height) = d.resolution_height {
        set.push("resolution_height = ").push_bind_unseparated(height);
    }
    if let Some(frame_rate) = d.frame_rate {
        set.push("frame_rate = ").push_bind_unseparated(frame_rate);
    }
    if let Some(level) = d.difficulty_level {
        set.push("difficulty_level = ").push_bind_unseparated(level.as_str());
    }
    if let Some(hours) = d.estimated_hours {
        set.push("estimated_hours = ").push_bind_unseparated(hours);
    }
    if let Some(tags) = &d.tags {
        set.push("tags = ").push_bind_unseparated(tags.clone());
    }
    if let Some(url) = &d.thumbnail_url {
        set.push("thumbnail_url = ").push_bind_unseparated(url.clone());
    }
    if let Some(organization_id) = d.organization_id {
        set.push("organization_id = ").push_bind_unseparated(organization_id);
    }
    set.push("updated_at = NOW()");

    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(" AND deleted_at IS NULL RETURNING *) SELECT ")
        .push(PROJECT_COLUMNS)
        .push(", FALSE AS is_favorite FROM written p LEFT JOIN users u ON u.id = p.created_by");
    qb
}
