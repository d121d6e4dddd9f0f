//! Authentication middleware for Axum
//!
//! Resolves the access token (cookie, then bearer header) to an active user
//! and stores it as [`CurrentUser`] in the request extensions.
//! [`admin_middleware`] then gates the administrator routes before any body
//! or query is parsed.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::common::cookies;
use super::error::ApiError;
use super::state::AppState;
use crate::application::identity::TokenError;
use crate::application::AuthGateway;
use crate::domain::{DomainError, User};
use crate::infrastructure::crypto::TokenClaims;

const MISSING_CREDENTIALS: &str = "Authentication credentials were not provided.";
const INVALID_SESSION: &str = "Given token not valid for any token type";

/// Authenticated caller, available to handlers behind [`auth_middleware`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: User,
    pub claims: TokenClaims,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = cookies::access_token(request.headers()) else {
        return ApiError(DomainError::Unauthenticated(MISSING_CREDENTIALS.to_string()))
            .into_response();
    };

    match state.gateway.tokens().authenticate(&token).await {
        Ok((user, claims)) => {
            request.extensions_mut().insert(CurrentUser { user, claims });
            next.run(request).await
        }
        Err(TokenError::UserInactive(id)) => {
            debug!(user_id = id, "request from inactive account");
            ApiError(DomainError::AccountInactive).into_response()
        }
        Err(TokenError::Storage(e)) => ApiError(e).into_response(),
        Err(cause) => {
            debug!(%cause, "access token rejected");
            ApiError(DomainError::Unauthenticated(INVALID_SESSION.to_string())).into_response()
        }
    }
}

/// Rejects non-administrators with 403. Must run inside [`auth_middleware`].
pub async fn admin_middleware(request: Request<Body>, next: Next) -> Response {
    let Some(current) = request.extensions().get::<CurrentUser>() else {
        return ApiError(DomainError::Unauthenticated(MISSING_CREDENTIALS.to_string()))
            .into_response();
    };
    if let Err(e) = AuthGateway::require_admin(&current.user) {
        debug!(user_id = current.user.id, "non-administrator refused");
        return ApiError(e).into_response();
    }
    next.run(request).await
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError(DomainError::Unauthenticated(MISSING_CREDENTIALS.to_string())))
    }
}
