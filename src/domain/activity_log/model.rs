use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Kinds of audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityAction {
    Login,
    Logout,
    UserCreated,
    UserUpdated,
    UserDeleted,
    StatusChanged,
    PasswordReset,
    ProfileUpdated,
    AvatarUpdated,
    OtpSent,
    PasswordResetSuccess,
    AdminPasswordVerificationFailed,
    PasswordResetAttemptFailed,
}

impl ActivityAction {
    pub const ALL: [ActivityAction; 13] = [
        ActivityAction::Login,
        ActivityAction::Logout,
        ActivityAction::UserCreated,
        ActivityAction::UserUpdated,
        ActivityAction::UserDeleted,
        ActivityAction::StatusChanged,
        ActivityAction::PasswordReset,
        ActivityAction::ProfileUpdated,
        ActivityAction::AvatarUpdated,
        ActivityAction::OtpSent,
        ActivityAction::PasswordResetSuccess,
        ActivityAction::AdminPasswordVerificationFailed,
        ActivityAction::PasswordResetAttemptFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Login => "login",
            ActivityAction::Logout => "logout",
            ActivityAction::UserCreated => "user_created",
            ActivityAction::UserUpdated => "user_updated",
            ActivityAction::UserDeleted => "user_deleted",
            ActivityAction::StatusChanged => "status_changed",
            ActivityAction::PasswordReset => "password_reset",
            ActivityAction::ProfileUpdated => "profile_updated",
            ActivityAction::AvatarUpdated => "avatar_updated",
            ActivityAction::OtpSent => "otp_sent",
            ActivityAction::PasswordResetSuccess => "password_reset_success",
            ActivityAction::AdminPasswordVerificationFailed => {
                "admin_password_verification_failed"
            }
            ActivityAction::PasswordResetAttemptFailed => "password_reset_attempt_failed",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("Unknown activity action: {s}"))
    }
}

/// Stored audit record. Never updated after insert.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    pub id: i32,
    pub admin_id: Option<i32>,
    pub user_id: Option<i32>,
    pub action: ActivityAction,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

/// Audit record about to be appended.
#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub admin_id: Option<i32>,
    pub user_id: Option<i32>,
    pub action: ActivityAction,
    pub details: Map<String, Value>,
}

impl NewActivityLog {
    pub fn new(action: ActivityAction) -> Self {
        Self {
            admin_id: None,
            user_id: None,
            action,
            details: Map::new(),
        }
    }

    pub fn admin(mut self, admin_id: i32) -> Self {
        self.admin_id = Some(admin_id);
        self
    }

    pub fn user(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityLogFilter {
    pub action: Option<ActivityAction>,
    pub admin_id: Option<i32>,
    pub user_id: Option<i32>,
    /// Matched against actor/subject names and emails and the details payload.
    pub search: Option<String>,
}
