//! Authentication DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::User;
use crate::interfaces::http::modules::users::UserDto;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address."))]
    #[schema(example = "admin@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// Session payload returned by login, refresh, `/me` and `/authenticated`.
///
/// Tokens travel in HttpOnly cookies only and never appear in the body.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Clients should force a password change while this is set.
    pub using_default_password: bool,
    pub user: UserDto,
}

impl From<User> for SessionResponse {
    fn from(user: User) -> Self {
        Self {
            using_default_password: user.using_default_password,
            user: UserDto::from(user),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyPasswordResetRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    /// Six-digit code from the reset e-mail
    #[validate(length(min = 1, message = "This field may not be blank."))]
    #[schema(example = "042917")]
    pub otp: String,
    pub new_password: String,
}
