use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value;

use super::{contains_pattern, db_err};
use crate::domain::{
    ActivityLog, ActivityLogFilter, DomainError, DomainResult, NewActivityLog,
};
use crate::infrastructure::database::entities::activity_log;
use crate::shared::{total_pages, PaginatedResult, PaginationParams};

pub struct ActivityLogRepository<'c, C> {
    conn: &'c C,
}

fn log_model_to_domain(model: activity_log::Model) -> DomainResult<ActivityLog> {
    let action = model.action.parse().map_err(DomainError::Internal)?;
    let details = serde_json::from_str(&model.details)
        .unwrap_or_else(|_| Value::Object(Default::default()));

    Ok(ActivityLog {
        id: model.id,
        admin_id: model.admin_id,
        user_id: model.user_id,
        action,
        details,
        created_at: model.created_at,
    })
}

impl<'c, C: ConnectionTrait> ActivityLogRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, entry: NewActivityLog) -> DomainResult<ActivityLog> {
        let details = Value::Object(entry.details).to_string();

        let model = activity_log::ActiveModel {
            admin_id: Set(entry.admin_id),
            user_id: Set(entry.user_id),
            action: Set(entry.action.as_str().to_string()),
            details: Set(details),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .map_err(db_err)?;

        log_model_to_domain(model)
    }

    /// Newest-first page of logs. `search_user_ids` are the accounts whose
    /// name or email matched the free-text term; a page past the end is
    /// clamped to the last page.
    pub async fn query(
        &self,
        filter: &ActivityLogFilter,
        search_user_ids: &[i32],
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<ActivityLog>> {
        let mut query = activity_log::Entity::find();

        if let Some(action) = filter.action {
            query = query.filter(activity_log::Column::Action.eq(action.as_str()));
        }
        if let Some(admin_id) = filter.admin_id {
            query = query.filter(activity_log::Column::AdminId.eq(admin_id));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(activity_log::Column::UserId.eq(user_id));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let details = Expr::expr(Func::lower(Expr::col(activity_log::Column::Details)));
            let mut any = Condition::any().add(details.like(contains_pattern(term)));
            if !search_user_ids.is_empty() {
                any = any
                    .add(activity_log::Column::AdminId.is_in(search_user_ids.iter().copied()))
                    .add(activity_log::Column::UserId.is_in(search_user_ids.iter().copied()));
            }
            query = query.filter(any);
        }

        let total = query.clone().count(self.conn).await.map_err(db_err)?;
        let pages = total_pages(total, params.page_size);
        let page = params.page.clamp(1, pages);

        let models = query
            .order_by_desc(activity_log::Column::CreatedAt)
            .order_by_desc(activity_log::Column::Id)
            .offset((page - 1) * params.page_size)
            .limit(params.page_size)
            .all(self.conn)
            .await
            .map_err(db_err)?;

        let items = models
            .into_iter()
            .map(log_model_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(items, total, page, params.page_size))
    }
}
