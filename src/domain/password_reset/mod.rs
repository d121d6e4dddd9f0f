//! Password-reset one-time codes

pub mod model;

pub use model::{PasswordResetOtp, OTP_MAX, OTP_MIN};
