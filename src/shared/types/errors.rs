use std::collections::BTreeMap;

use thiserror::Error;

/// Field name → human-readable messages, as returned in validation responses.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Your account is not active.")]
    AccountInactive,

    #[error("{0}")]
    Unauthenticated(String),

    /// A presented refresh token was missing, malformed, expired or revoked.
    #[error("{0}")]
    InvalidToken(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    CannotModifySelf(String),

    #[error("{entity} not found with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{message}")]
    Conflict {
        field: &'static str,
        message: String,
    },

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { field: &'static str, min: usize },

    #[error("Invalid or expired OTP")]
    InvalidOrExpiredOtp,

    #[error("{0}")]
    DeliveryFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        DomainError::Validation(errors)
    }

    pub fn user_not_found(field: &'static str, value: impl ToString) -> Self {
        DomainError::NotFound {
            entity: "User",
            field,
            value: value.to_string(),
        }
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}
