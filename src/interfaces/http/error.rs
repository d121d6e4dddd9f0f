//! Mapping of domain errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::common::ApiResponse;
use crate::domain::{DomainError, FieldErrors};

/// Handler error type. Wraps a [`DomainError`] and renders it as an
/// [`ApiResponse`] with the matching status code.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError(e)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn single(field: &str, message: String) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message]);
    errors
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            DomainError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::validation("Validation failed", errors),
            ),
            DomainError::Conflict { field, message } => (
                StatusCode::BAD_REQUEST,
                ApiResponse::validation("Validation failed", single(field, message)),
            ),
            DomainError::PasswordTooShort { field, min } => {
                let message = DomainError::PasswordTooShort { field, min }.to_string();
                (
                    StatusCode::BAD_REQUEST,
                    ApiResponse::validation(message.clone(), single(field, message)),
                )
            }
            e @ (DomainError::InvalidOrExpiredOtp
            | DomainError::InvalidCredentials
            | DomainError::InvalidToken(_)
            | DomainError::CannotModifySelf(_)) => {
                (StatusCode::BAD_REQUEST, ApiResponse::error(e.to_string()))
            }
            e @ (DomainError::AccountInactive | DomainError::Forbidden(_)) => {
                (StatusCode::FORBIDDEN, ApiResponse::error(e.to_string()))
            }
            e @ DomainError::Unauthenticated(_) => {
                (StatusCode::UNAUTHORIZED, ApiResponse::error(e.to_string()))
            }
            DomainError::NotFound { field, .. } => {
                let message = if field == "email" {
                    "User not found with this email"
                } else {
                    "User not found"
                };
                (StatusCode::NOT_FOUND, ApiResponse::error(message))
            }
            e @ DomainError::DeliveryFailed(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::error(e.to_string()),
            ),
            e @ (DomainError::Database(_) | DomainError::Internal(_)) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::error("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
