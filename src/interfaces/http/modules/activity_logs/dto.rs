//! Activity log DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::application::identity::{ActivityLogEntry, UserSummary};
use crate::domain::{ActivityAction, ActivityLogFilter, DomainError};
use crate::shared::{PaginatedResult, PaginationParams};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummaryDto {
    pub id: i32,
    pub email: String,
    pub full_name: String,
}

impl From<UserSummary> for UserSummaryDto {
    fn from(s: UserSummary) -> Self {
        Self {
            id: s.id,
            email: s.email,
            full_name: s.full_name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityLogDto {
    pub id: i32,
    #[schema(example = "user_created")]
    pub action: String,
    /// Acting administrator, absent for self-service actions or deleted accounts
    pub admin: Option<UserSummaryDto>,
    /// Affected account, absent once deleted
    pub user: Option<UserSummaryDto>,
    #[schema(value_type = Object)]
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityLogEntry> for ActivityLogDto {
    fn from(entry: ActivityLogEntry) -> Self {
        Self {
            id: entry.log.id,
            action: entry.log.action.as_str().to_string(),
            admin: entry.admin.map(Into::into),
            user: entry.user.map(Into::into),
            details: entry.log.details,
            created_at: entry.log.created_at,
        }
    }
}

/// One page of the audit trail
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityLogPage {
    pub results: Vec<ActivityLogDto>,
    /// Total matching rows
    pub count: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl From<PaginatedResult<ActivityLogEntry>> for ActivityLogPage {
    fn from(page: PaginatedResult<ActivityLogEntry>) -> Self {
        Self {
            has_next: page.has_next(),
            has_previous: page.has_previous(),
            count: page.total,
            total_pages: page.total_pages,
            current_page: page.page,
            results: page.items.into_iter().map(ActivityLogDto::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActivityLogQuery {
    /// 1-based, clamped to the last page
    pub page: Option<u64>,
    /// Default 20, max 100
    pub page_size: Option<u64>,
    pub action: Option<String>,
    pub admin_id: Option<i32>,
    pub user_id: Option<i32>,
    /// Matches names, emails and details
    pub search: Option<String>,
}

impl ActivityLogQuery {
    pub fn into_filter(self) -> Result<(ActivityLogFilter, PaginationParams), DomainError> {
        let action = match self.action.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<ActivityAction>()
                    .map_err(|e| DomainError::invalid("action", e))?,
            ),
        };

        let filter = ActivityLogFilter {
            action,
            admin_id: self.admin_id,
            user_id: self.user_id,
            search: self.search.filter(|s| !s.trim().is_empty()),
        };
        Ok((filter, PaginationParams::from_query(self.page, self.page_size)))
    }
}
