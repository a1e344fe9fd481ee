//! Project models for the API service

use std::{fmt, str::FromStr, sync::OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a project
///
/// `Published` is stored as `completed`; both spellings are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    InProgress,
    Review,
    Approved,
    #[serde(alias = "completed")]
    Published,
    Archived,
    Deleted,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 7] = [
        ProjectStatus::Draft,
        ProjectStatus::InProgress,
        ProjectStatus::Review,
        ProjectStatus::Approved,
        ProjectStatus::Published,
        ProjectStatus::Archived,
        ProjectStatus::Deleted,
    ];

    /// Name used in API payloads
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Review => "review",
            ProjectStatus::Approved => "approved",
            ProjectStatus::Published => "published",
            ProjectStatus::Archived => "archived",
            ProjectStatus::Deleted => "deleted",
        }
    }

    /// Value stored in the `projects.status` column
    pub fn as_db_str(self) -> &'static str {
        match self {
            ProjectStatus::Published => "completed",
            other => other.as_str(),
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ProjectStatus::Published),
            _ => ProjectStatus::ALL
                .into_iter()
                .find(|status| status.as_str() == s)
                .ok_or_else(|| format!("Unknown project status: {s}")),
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory difficulty rating of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
            DifficultyLevel::Expert => "expert",
        }
    }
}

impl FromStr for DifficultyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(DifficultyLevel::Beginner),
            "intermediate" => Ok(DifficultyLevel::Intermediate),
            "advanced" => Ok(DifficultyLevel::Advanced),
            "expert" => Ok(DifficultyLevel::Expert),
            _ => Err(format!("Unknown difficulty level: {s}")),
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub duration_seconds: f64,
    pub resolution_width: Option<i32>,
    pub resolution_height: Option<i32>,
    pub frame_rate: Option<f64>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub estimated_hours: Option<f64>,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub created_by: Uuid,
    pub author_name: Option<String>,
    pub author_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub organization_id: Option<Uuid>,
    /// Whether the requesting viewer has liked the project
    pub is_favorite: bool,
}

/// Optional descriptive fields shared by creation and update payloads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub slug: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub duration_seconds: Option<f64>,
    pub resolution_width: Option<i32>,
    pub resolution_height: Option<i32>,
    pub frame_rate: Option<f64>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub estimated_hours: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub thumbnail_url: Option<String>,
    pub organization_id: Option<Uuid>,
}

/// Request body for project creation
///
/// `name` and `created_by` are optional here so a missing field can be
/// reported as a validation error rather than a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub created_by: Option<Uuid>,
    #[serde(flatten)]
    pub details: ProjectDetails,
}

impl CreateProjectRequest {
    /// Check the required fields and turn the request into a [`NewProject`]
    pub fn into_new_project(self) -> Result<NewProject, String> {
        match (self.name, self.created_by) {
            (Some(name), Some(created_by)) if !name.trim().is_empty() => Ok(NewProject {
                name,
                created_by,
                details: self.details,
            }),
            _ => Err("Name and created_by are required".to_string()),
        }
    }
}

/// New project creation payload
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub created_by: Uuid,
    pub details: ProjectDetails,
}

impl NewProject {
    pub fn new(name: impl Into<String>, created_by: Uuid) -> Self {
        Self {
            name: name.into(),
            created_by,
            details: ProjectDetails::default(),
        }
    }

    /// Explicit slug if one was given, otherwise one derived from the name
    pub fn slug(&self) -> String {
        match self.details.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => slugify(&self.name),
        }
    }

    pub fn status(&self) -> ProjectStatus {
        self.details.status.unwrap_or(ProjectStatus::Draft)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.details.duration_seconds.unwrap_or(0.0)
    }

    pub fn tags(&self) -> Vec<String> {
        self.details.tags.clone().unwrap_or_default()
    }
}

/// Project update payload
///
/// Identity, ownership and creation time are not part of the payload, so
/// they can never be patched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    #[serde(flatten)]
    pub details: ProjectDetails,
}

impl UpdateProject {
    /// True when the patch would change nothing
    pub fn is_empty(&self) -> bool {
        let d = &self.details;
        self.name.is_none()
            && d.slug.is_none()
            && d.description.is_none()
            && d.status.is_none()
            && d.duration_seconds.is_none()
            && d.resolution_width.is_none()
            && d.resolution_height.is_none()
            && d.frame_rate.is_none()
            && d.difficulty_level.is_none()
            && d.estimated_hours.is_none()
            && d.tags.is_none()
            && d.thumbnail_url.is_none()
            && d.organization_id.is_none()
    }
}

/// Response for project listing with pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

/// Per-status counts of live projects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub draft: i64,
    pub in_progress: i64,
    pub review: i64,
    pub approved: i64,
    pub published: i64,
    pub archived: i64,
}

impl StatusTally {
    fn named(&self) -> i64 {
        self.draft + self.in_progress + self.review + self.approved + self.published + self.archived
    }
}

impl FromIterator<ProjectStatus> for StatusTally {
    fn from_iter<I: IntoIterator<Item = ProjectStatus>>(iter: I) -> Self {
        let mut tally = StatusTally::default();
        for status in iter {
            match status {
                ProjectStatus::Draft => tally.draft += 1,
                ProjectStatus::InProgress => tally.in_progress += 1,
                ProjectStatus::Review => tally.review += 1,
                ProjectStatus::Approved => tally.approved += 1,
                ProjectStatus::Published => tally.published += 1,
                ProjectStatus::Archived => tally.archived += 1,
                ProjectStatus::Deleted => {}
            }
        }
        tally
    }
}

/// Aggregate statistics over live projects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub total: i64,
    pub draft: i64,
    pub in_progress: i64,
    pub review: i64,
    pub approved: i64,
    pub published: i64,
    pub archived: i64,
    /// Live projects in none of the named buckets
    pub others: i64,
    pub total_duration: f64,
    pub total_views: i64,
    pub total_likes: i64,
}

impl ProjectStats {
    pub fn new(total: i64, tally: StatusTally) -> Self {
        Self {
            total,
            draft: tally.draft,
            in_progress: tally.in_progress,
            review: tally.review,
            approved: tally.approved,
            published: tally.published,
            archived: tally.archived,
            others: (total - tally.named()).max(0),
            ..Self::default()
        }
    }
}

/// Response for favorite toggling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteResponse {
    #[serde(rename = "isFavorite")]
    pub is_favorite: bool,
}

/// Request body naming the acting user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewerRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

/// Derive a URL slug from a project name
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single `-` and trims dashes from both ends.
pub fn slugify(name: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let regex = SEPARATORS
        .get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("Failed to compile slug regex"));

    regex
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}
