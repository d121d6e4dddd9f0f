//! User management API handlers
//!
//! Administrator-only endpoints. Authorization and auditing happen in
//! [`AuthGateway`](crate::application::AuthGateway); handlers only translate
//! requests and responses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::dto::{
    AdminResetPasswordRequest, ChangeStatusRequest, ListUsersParams, RegisterRequest,
    RegisterResponse, ResetTargetDto, UpdateUserRequest, UserDto,
};
use crate::interfaces::http::common::{ApiResponse, Client, ValidatedJson};
use crate::interfaces::http::error::ApiResult;
use crate::interfaces::http::middleware::CurrentUser;
use crate::interfaces::http::state::AppState;

#[utoipa::path(
    post,
    path = "/api/register",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Validation error or duplicate email"),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RegisterResponse>>)> {
    let dto = request.into_dto()?;
    let outcome = state.gateway.register(&current.user, dto).await?;

    let message = if outcome.notification_sent {
        "User created successfully"
    } else {
        "User created successfully, but the notification email could not be sent"
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            message,
            RegisterResponse {
                user: UserDto::from(outcome.user),
                notification_sent: outcome.notification_sent,
            },
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "Users other than the caller",
            body = ApiResponse<Vec<UserDto>>),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ListUsersParams>,
) -> ApiResult<Json<ApiResponse<Vec<UserDto>>>> {
    let filter = params.into_dto()?;
    let users = state.gateway.list_users(&current.user, filter).await?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserDto>),
        (status = 400, description = "Validation error or self-modification"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let changes = request.into_dto()?;
    let user = state.gateway.update_user(&current.user, id, changes).await?;

    Ok(Json(ApiResponse::success_with_message(
        "User updated successfully",
        UserDto::from(user),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/status",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<UserDto>),
        (status = 400, description = "Invalid status or own account"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn change_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<ChangeStatusRequest>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let status = request.status.unwrap_or_default();
    let user = state
        .gateway
        .change_status(&current.user, id, status.trim())
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        format!("User status changed to {}", user.status),
        UserDto::from(user),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Own account"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.gateway.delete_user(&current.user, id).await?;
    Ok(Json(ApiResponse::message("User deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/admin-reset-password",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = AdminResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset to default",
            body = ApiResponse<ResetTargetDto>),
        (status = 400, description = "Wrong admin password or validation error"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn admin_reset_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Client(ctx): Client,
    ValidatedJson(request): ValidatedJson<AdminResetPasswordRequest>,
) -> ApiResult<Json<ApiResponse<ResetTargetDto>>> {
    let user = state
        .gateway
        .admin_reset_password(&current.user, &request.admin_password, &request.email, &ctx)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        format!("Password for {} has been reset to the default password", user.email),
        ResetTargetDto {
            full_name: user.full_name(),
            email: user.email,
        },
    )))
}
