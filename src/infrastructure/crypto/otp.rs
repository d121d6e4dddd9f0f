//! One-time reset code generation

use rand::Rng;

use crate::domain::password_reset::{OTP_MAX, OTP_MIN};

/// Uniformly random six-digit code in `100000..=999999`.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX).to_string()
}
