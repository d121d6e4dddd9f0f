//! User aggregate
//!
//! Contains the User entity, its role/status enumerations and the inputs
//! accepted by the credential store.

pub mod model;

mod dto_create;
mod dto_get;
mod dto_update;

// Re-export model types
pub use model::{normalize_email, User, UserLevel, UserStatus, MIN_PASSWORD_LENGTH};

// Re-export DTOs
pub use dto_create::CreateUserDto;
pub use dto_get::GetUserDto;
pub use dto_update::{UpdateProfileDto, UpdateUserDto};
