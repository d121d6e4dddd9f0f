use super::{UserLevel, UserStatus};

#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub user_level: UserLevel,
    pub status: UserStatus,
    /// `None` assigns the configured default password.
    pub password: Option<String>,
}
