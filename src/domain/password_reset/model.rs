use chrono::{DateTime, Utc};

/// Smallest issued code; six digits with no leading zero.
pub const OTP_MIN: u32 = 100_000;
pub const OTP_MAX: u32 = 999_999;

#[derive(Debug, Clone)]
pub struct PasswordResetOtp {
    pub id: i32,
    pub user_id: i32,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

impl PasswordResetOtp {
    /// Unused and strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn otp(expires_at: DateTime<Utc>, is_used: bool) -> PasswordResetOtp {
        PasswordResetOtp {
            id: 1,
            user_id: 1,
            code: "123456".into(),
            created_at: expires_at - Duration::minutes(15),
            expires_at,
            is_used,
        }
    }

    #[test]
    fn expiry_instant_is_already_expired() {
        let now = Utc::now();
        assert!(!otp(now, false).is_valid_at(now));
        assert!(otp(now, false).is_valid_at(now - Duration::milliseconds(1)));
    }

    #[test]
    fn used_code_is_never_valid() {
        let now = Utc::now();
        assert!(!otp(now + Duration::minutes(10), true).is_valid_at(now));
    }
}
