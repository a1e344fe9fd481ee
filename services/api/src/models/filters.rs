//! Listing filters, sorting and pagination

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::project::{DifficultyLevel, ProjectStatus};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 12;
pub const MAX_LIMIT: u32 = 100;

/// Column a project listing is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    Name,
    #[default]
    CreatedAt,
    UpdatedAt,
    DurationSeconds,
}

impl SortField {
    /// Parse a sort parameter; unknown values fall back to `created_at`
    pub fn from_param(value: &str) -> Self {
        match value {
            "name" => SortField::Name,
            "updated_at" => SortField::UpdatedAt,
            "duration_seconds" => SortField::DurationSeconds,
            _ => SortField::CreatedAt,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortField::Name => "p.name",
            SortField::CreatedAt => "p.created_at",
            SortField::UpdatedAt => "p.updated_at",
            SortField::DurationSeconds => "p.duration_seconds",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Anything other than `asc` sorts descending
    pub fn from_param(value: &str) -> Self {
        if value.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Inclusive bounds on `created_at`; either side may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Structured project listing filter
///
/// Every predicate is optional; an empty filter selects every live project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilters {
    pub search: Option<String>,
    pub status: Option<ProjectStatus>,
    pub created_by: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub tags: Vec<String>,
    pub date_range: Option<DateRange>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

/// One-based page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Both `page` and `limit` must be positive
    pub fn new(page: u32, limit: u32) -> Result<Self, String> {
        if page == 0 || limit == 0 {
            return Err(format!(
                "page and limit must be positive integers (page={page}, limit={limit})"
            ));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    /// True when rows exist beyond this page
    pub fn has_more(&self, total: i64) -> bool {
        i64::from(self.page) * i64::from(self.limit) < total
    }
}

/// Query parameters for project listing
///
/// Values arrive as raw strings so that empty parameters can be treated as
/// absent and malformed ones reported as a bad request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListQuery {
    /// Page number (1-based)
    pub page: Option<String>,
    /// Number of items per page
    pub limit: Option<String>,
    /// Substring matched against name, description and slug
    pub search: Option<String>,
    /// Exact status, or `all`
    pub status: Option<String>,
    pub created_by: Option<String>,
    pub organization_id: Option<String>,
    pub difficulty_level: Option<String>,
    /// Comma separated tag list; a project matches if it has any of them
    pub tags: Option<String>,
    /// RFC 3339 lower bound on creation time
    pub date_from: Option<String>,
    /// RFC 3339 upper bound on creation time
    pub date_to: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    /// Viewer whose favorites are reported
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// A fully parsed listing request
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub filters: ProjectFilters,
    pub pagination: Pagination,
    pub viewer: Option<Uuid>,
}

impl ProjectListQuery {
    /// Parse the raw parameters, applying listing defaults
    pub fn parse(&self) -> Result<ListRequest, String> {
        let page = parse_number(present(&self.page), "page")?.unwrap_or(DEFAULT_PAGE);
        let limit = parse_number(present(&self.limit), "limit")?.unwrap_or(DEFAULT_LIMIT);
        let pagination = Pagination::new(page.max(1), limit.clamp(1, MAX_LIMIT))?;

        let status = match present(&self.status) {
            None | Some("all") => None,
            Some(status) => Some(status.parse::<ProjectStatus>()?),
        };

        let difficulty_level = present(&self.difficulty_level)
            .map(str::parse::<DifficultyLevel>)
            .transpose()?;

        let tags = present(&self.tags)
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let start = parse_timestamp(present(&self.date_from), "date_from")?;
        let end = parse_timestamp(present(&self.date_to), "date_to")?;
        let date_range = (start.is_some() || end.is_some()).then_some(DateRange { start, end });

        let filters = ProjectFilters {
            search: present(&self.search).map(str::to_string),
            status,
            created_by: parse_uuid(present(&self.created_by), "created_by")?,
            organization_id: parse_uuid(present(&self.organization_id), "organization_id")?,
            difficulty_level,
            tags,
            date_range,
            sort_by: present(&self.sort_by)
                .map(SortField::from_param)
                .unwrap_or_default(),
            sort_order: present(&self.sort_order)
                .map(SortOrder::from_param)
                .unwrap_or_default(),
        };

        Ok(ListRequest {
            filters,
            pagination,
            viewer: parse_uuid(present(&self.user_id), "userId")?,
        })
    }
}

/// Query parameters that only carry an optional viewer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewerQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl ViewerQuery {
    pub fn viewer(&self) -> Result<Option<Uuid>, String> {
        parse_uuid(present(&self.user_id), "userId")
    }
}

/// Query parameters for the statistics endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    pub organization_id: Option<String>,
}

impl StatsQuery {
    pub fn organization_id(&self) -> Result<Option<Uuid>, String> {
        parse_uuid(present(&self.organization_id), "organization_id")
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(value: Option<&str>, name: &str) -> Result<Option<u32>, String> {
    value
        .map(|v| {
            v.parse::<i64>()
                .map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
                .map_err(|_| format!("{name} must be an integer"))
        })
        .transpose()
}

fn parse_uuid(value: Option<&str>, name: &str) -> Result<Option<Uuid>, String> {
    value
        .map(|v| Uuid::parse_str(v).map_err(|_| format!("{name} must be a valid UUID")))
        .transpose()
}

fn parse_timestamp(value: Option<&str>, name: &str) -> Result<Option<DateTime<Utc>>, String> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| format!("{name} must be an RFC 3339 timestamp"))
        })
        .transpose()
}
