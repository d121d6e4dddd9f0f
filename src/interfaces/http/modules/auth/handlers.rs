//! Authentication API handlers
//!
//! Session tokens are delivered as HttpOnly cookies; see
//! [`CookieConfig`](crate::interfaces::http::common::CookieConfig).

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};

use super::dto::{LoginRequest, PasswordResetRequest, SessionResponse, VerifyPasswordResetRequest};
use crate::application::identity::RESET_REQUESTED_MESSAGE;
use crate::interfaces::http::common::{cookies, ApiResponse, Client, ValidatedJson};
use crate::interfaces::http::error::ApiResult;
use crate::interfaces::http::middleware::CurrentUser;
use crate::interfaces::http::state::AppState;

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookies set",
            body = ApiResponse<SessionResponse>),
        (status = 400, description = "Invalid email or password"),
        (status = 403, description = "Account is inactive")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Client(ctx): Client,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<(HeaderMap, Json<ApiResponse<SessionResponse>>)> {
    let outcome = state
        .gateway
        .login(&request.email, &request.password, &ctx)
        .await?;

    let mut headers = HeaderMap::new();
    state.cookies.set_session(&mut headers, &outcome.tokens);

    Ok((
        headers,
        Json(ApiResponse::success_with_message(
            "Login successful",
            SessionResponse::from(outcome.user),
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/token/refresh",
    tag = "Authentication",
    responses(
        (status = 200, description = "Session rotated, new cookies set",
            body = ApiResponse<SessionResponse>),
        (status = 400, description = "Refresh token missing or invalid"),
        (status = 403, description = "Account is inactive"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    request_headers: HeaderMap,
) -> ApiResult<(HeaderMap, Json<ApiResponse<SessionResponse>>)> {
    let token = cookies::refresh_token(&request_headers);
    let (user, tokens) = state.gateway.refresh(token.as_deref()).await?;

    let mut headers = HeaderMap::new();
    state.cookies.set_session(&mut headers, &tokens);

    Ok((
        headers,
        Json(ApiResponse::success_with_message(
            "Token refreshed successfully",
            SessionResponse::from(user),
        )),
    ))
}

/// Always succeeds and clears both cookies, even when the presented tokens
/// were already invalid.
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "Authentication",
    responses(
        (status = 200, description = "Logged out, cookies cleared")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Client(ctx): Client,
    request_headers: HeaderMap,
) -> (HeaderMap, Json<ApiResponse<()>>) {
    let access = cookies::access_token(&request_headers);
    let refresh = cookies::refresh_token(&request_headers);
    state
        .gateway
        .logout(access.as_deref(), refresh.as_deref(), &ctx)
        .await;

    let mut headers = HeaderMap::new();
    state.cookies.clear_session(&mut headers);
    (headers, Json(ApiResponse::message("Logout successful")))
}

#[utoipa::path(
    post,
    path = "/api/request-password-reset",
    tag = "Authentication",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Same answer whether or not the account exists"),
        (status = 400, description = "Validation error"),
        (status = 503, description = "Reset code could not be delivered")
    )
)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Client(ctx): Client,
    ValidatedJson(request): ValidatedJson<PasswordResetRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .gateway
        .request_password_reset(&request.email, &ctx)
        .await?;
    Ok(Json(ApiResponse::message(RESET_REQUESTED_MESSAGE)))
}

#[utoipa::path(
    post,
    path = "/api/verify-password-reset",
    tag = "Authentication",
    request_body = VerifyPasswordResetRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Invalid or expired code, or weak password")
    )
)]
pub async fn verify_password_reset(
    State(state): State<AppState>,
    Client(ctx): Client,
    ValidatedJson(request): ValidatedJson<VerifyPasswordResetRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .gateway
        .verify_password_reset(&request.email, &request.otp, &request.new_password, &ctx)
        .await?;
    Ok(Json(ApiResponse::message(
        "Password has been reset successfully. You can now log in with your new password.",
    )))
}

#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<SessionResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Account is inactive")
    )
)]
pub async fn me(current: CurrentUser) -> Json<ApiResponse<SessionResponse>> {
    Json(ApiResponse::success(SessionResponse::from(current.user)))
}

#[utoipa::path(
    get,
    path = "/api/authenticated",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session is valid", body = ApiResponse<SessionResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn authenticated(current: CurrentUser) -> Json<ApiResponse<SessionResponse>> {
    Json(ApiResponse::success_with_message(
        "Authenticated",
        SessionResponse::from(current.user),
    ))
}
