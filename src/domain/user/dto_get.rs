use super::{UserLevel, UserStatus};

#[derive(Debug, Clone, Default)]
pub struct GetUserDto {
    pub search: Option<String>,
    pub status: Option<UserStatus>,
    pub user_level: Option<UserLevel>,
    /// Usually the caller, who never sees themselves in the list.
    pub exclude_id: Option<i32>,
}
