use super::{UserLevel, UserStatus};

/// Admin-side partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub user_level: Option<UserLevel>,
    pub status: Option<UserStatus>,
}

/// Self-service profile update.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileDto {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}
