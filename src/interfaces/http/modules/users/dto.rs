//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::user::{CreateUserDto, GetUserDto, UpdateUserDto};
use crate::domain::{DomainError, FieldErrors, User, UserLevel, UserStatus};

/// Public path under which stored media is served.
pub const MEDIA_URL: &str = "/media";

/// User API representation
#[derive(Debug, Serialize, ToSchema)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub full_name: String,
    #[schema(example = "air_quality_unit_head")]
    pub user_level: String,
    #[schema(example = "active")]
    pub status: String,
    pub avatar: String,
    pub avatar_url: String,
    pub using_default_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserDto {
    /// Same representation with a cache-busting suffix on the avatar URL.
    pub fn with_avatar_version(mut self, version: i64) -> Self {
        self.avatar_url = format!("{}?t={version}", self.avatar_url);
        self
    }
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            full_name: u.full_name(),
            avatar_url: format!("{MEDIA_URL}/{}", u.avatar),
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            middle_name: u.middle_name,
            user_level: u.user_level.as_str().to_string(),
            status: u.status.as_str().to_string(),
            avatar: u.avatar,
            using_default_password: u.using_default_password,
            created_at: u.created_at,
            updated_at: u.updated_at,
            last_login_at: u.last_login_at,
        }
    }
}

fn parse_choice<T: std::str::FromStr<Err = String>>(
    field: &str,
    raw: Option<&str>,
    errors: &mut FieldErrors,
) -> Option<T> {
    match raw?.parse() {
        Ok(value) => Some(value),
        Err(message) => {
            errors.entry(field.to_string()).or_default().push(message);
            None
        }
    }
}

fn finish<T>(errors: FieldErrors, value: impl FnOnce() -> T) -> Result<T, DomainError> {
    if errors.is_empty() {
        Ok(value())
    } else {
        Err(DomainError::Validation(errors))
    }
}

/// Create user request (administrator only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub middle_name: String,
    #[schema(example = "water_quality_unit_head")]
    pub user_level: String,
    /// Defaults to `active`.
    pub status: Option<String>,
    /// Defaults to the configured default password.
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn into_dto(self) -> Result<CreateUserDto, DomainError> {
        let mut errors = FieldErrors::new();
        let user_level =
            parse_choice::<UserLevel>("user_level", Some(&self.user_level), &mut errors);
        let status = parse_choice::<UserStatus>("status", self.status.as_deref(), &mut errors);

        finish(errors, || CreateUserDto {
            email: self.email,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            middle_name: self.middle_name.trim().to_string(),
            user_level: user_level.unwrap_or(UserLevel::SolidWasteMonitoringPersonnel),
            status: status.unwrap_or(UserStatus::Active),
            password: self.password.filter(|p| !p.is_empty()),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserDto,
    /// Whether the account e-mail went out.
    pub notification_sent: bool,
}

/// Partial update of another account
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub last_name: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub middle_name: Option<String>,
    pub user_level: Option<String>,
    pub status: Option<String>,
}

impl UpdateUserRequest {
    pub fn into_dto(self) -> Result<UpdateUserDto, DomainError> {
        let mut errors = FieldErrors::new();
        let user_level =
            parse_choice::<UserLevel>("user_level", self.user_level.as_deref(), &mut errors);
        let status = parse_choice::<UserStatus>("status", self.status.as_deref(), &mut errors);

        finish(errors, || UpdateUserDto {
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            middle_name: self.middle_name,
            user_level,
            status,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeStatusRequest {
    #[schema(example = "inactive")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminResetPasswordRequest {
    #[validate(length(min = 1, message = "Admin password is required"))]
    pub admin_password: String,
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResetTargetDto {
    pub email: String,
    pub full_name: String,
}

/// List users query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersParams {
    /// `active` or `inactive`
    pub status: Option<String>,
    pub user_level: Option<String>,
    /// Matches email, first or last name
    pub search: Option<String>,
}

impl ListUsersParams {
    pub fn into_dto(self) -> Result<GetUserDto, DomainError> {
        let mut errors = FieldErrors::new();
        let status = parse_choice::<UserStatus>(
            "status",
            self.status.as_deref().filter(|s| !s.is_empty()),
            &mut errors,
        );
        let user_level = parse_choice::<UserLevel>(
            "user_level",
            self.user_level.as_deref().filter(|s| !s.is_empty()),
            &mut errors,
        );

        finish(errors, || GetUserDto {
            search: self.search,
            status,
            user_level,
            exclude_id: None,
        })
    }
}
