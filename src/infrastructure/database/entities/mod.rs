//! Database entities module

pub mod activity_log;
pub mod blacklisted_token;
pub mod password_reset_otp;
pub mod user;

pub use activity_log::Entity as ActivityLog;
pub use blacklisted_token::Entity as BlacklistedToken;
pub use password_reset_otp::Entity as PasswordResetOtp;
pub use user::Entity as User;
