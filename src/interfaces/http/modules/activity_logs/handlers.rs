use axum::extract::{Query, State};
use axum::Json;

use super::dto::{ActivityLogPage, ActivityLogQuery};
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::error::ApiResult;
use crate::interfaces::http::middleware::CurrentUser;
use crate::interfaces::http::state::AppState;

/// Audit trail, newest first.
#[utoipa::path(
    get,
    path = "/api/activity-logs",
    tag = "Activity logs",
    security(("bearer_auth" = [])),
    params(ActivityLogQuery),
    responses(
        (status = 200, description = "One page of activity", body = ApiResponse<ActivityLogPage>),
        (status = 400, description = "Unknown action filter"),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn list_activity_logs(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ActivityLogQuery>,
) -> ApiResult<Json<ApiResponse<ActivityLogPage>>> {
    let (filter, params) = query.into_filter()?;
    let page = state
        .gateway
        .activity_logs(&current.user, &filter, params)
        .await?;

    Ok(Json(ApiResponse::success(ActivityLogPage::from(page))))
}
