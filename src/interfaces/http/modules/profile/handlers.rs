//! Profile handlers for the signed-in user

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;

use super::dto::{AvatarForm, UpdateProfileRequest};
use crate::application::identity::AvatarUpload;
use crate::domain::DomainError;
use crate::interfaces::http::common::{ApiResponse, ValidatedJson};
use crate::interfaces::http::error::ApiResult;
use crate::interfaces::http::middleware::CurrentUser;
use crate::interfaces::http::modules::users::UserDto;
use crate::interfaces::http::state::AppState;

/// Multipart part holding the picture.
pub const AVATAR_FIELD: &str = "avatar";

#[utoipa::path(
    patch,
    path = "/api/me/update",
    tag = "Profile",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserDto>),
        (status = 400, description = "Validation error or wrong current password")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let user = state
        .gateway
        .update_own_profile(&current.user, request.into())
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        "Profile updated successfully",
        UserDto::from(user),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/update-avatar",
    tag = "Profile",
    security(("bearer_auth" = [])),
    request_body(content = AvatarForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar replaced", body = ApiResponse<UserDto>),
        (status = 400, description = "Missing, oversized or unsupported file")
    )
)]
pub async fn update_avatar(
    State(state): State<AppState>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::invalid(AVATAR_FIELD, format!("Invalid upload: {e}")))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(String::from);
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| DomainError::invalid(AVATAR_FIELD, format!("Invalid upload: {e}")))?;

        upload = Some(AvatarUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let Some(upload) = upload else {
        return Err(DomainError::invalid(AVATAR_FIELD, "No avatar file provided").into());
    };

    let user = state.gateway.update_avatar(&current.user, upload).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Avatar updated successfully",
        UserDto::from(user).with_avatar_version(Utc::now().timestamp()),
    )))
}
