//! Audit logger: append-only activity trail and its read side.

use std::collections::HashMap;

use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::debug;

use crate::domain::{ActivityLog, ActivityLogFilter, DomainResult, NewActivityLog, User};
use crate::infrastructure::database::repositories::{ActivityLogRepository, UserRepository};
use crate::shared::{PaginatedResult, PaginationParams};

/// Actor or subject as shown next to a log row.
#[derive(Debug, Clone)]
pub struct UserSummary {
    pub id: i32,
    pub email: String,
    pub full_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name(),
        }
    }
}

/// A log row with its (still existing) actor and subject resolved.
#[derive(Debug, Clone)]
pub struct ActivityLogEntry {
    pub log: ActivityLog,
    pub admin: Option<UserSummary>,
    pub user: Option<UserSummary>,
}

#[derive(Clone)]
pub struct AuditLogger {
    db: DatabaseConnection,
}

impl AuditLogger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append one record on `conn`; pass the open transaction of the
    /// mutation being described.
    pub async fn record<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: NewActivityLog,
    ) -> DomainResult<ActivityLog> {
        let log = ActivityLogRepository::new(conn).insert(entry).await?;
        debug!(
            action = %log.action,
            admin_id = ?log.admin_id,
            user_id = ?log.user_id,
            "activity recorded"
        );
        Ok(log)
    }

    /// Newest-first, filtered page of the trail.
    pub async fn query(
        &self,
        filter: &ActivityLogFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<ActivityLogEntry>> {
        let users = UserRepository::new(&self.db);

        let search_ids = match filter.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => users.matching_ids(term).await?,
            _ => Vec::new(),
        };

        let page = ActivityLogRepository::new(&self.db)
            .query(filter, &search_ids, params)
            .await?;

        let mut ids: Vec<i32> = page
            .items
            .iter()
            .flat_map(|log| [log.admin_id, log.user_id])
            .flatten()
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let known: HashMap<i32, UserSummary> = users
            .find_many(&ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        Ok(page.map(|log| ActivityLogEntry {
            admin: log.admin_id.and_then(|id| known.get(&id).cloned()),
            user: log.user_id.and_then(|id| known.get(&id).cloned()),
            log,
        }))
    }
}
