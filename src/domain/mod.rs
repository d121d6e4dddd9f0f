pub mod activity_log;
pub mod password_reset;
pub mod user;

// Re-export commonly used types
pub use activity_log::{ActivityAction, ActivityLog, ActivityLogFilter, NewActivityLog};
pub use password_reset::PasswordResetOtp;
pub use user::{User, UserLevel, UserStatus};

// Re-export DomainError from shared for convenience
pub use crate::shared::types::{DomainError, DomainResult, FieldErrors};
