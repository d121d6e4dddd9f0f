//! Outbound ports: interfaces to collaborators outside the auth core
//!
//! [`Notifier`] delivers account e-mails (reset codes, account creation);
//! [`AvatarStorage`] keeps uploaded profile pictures. Message templating and
//! transport live behind these traits.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::User;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

/// Outbound account notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a password-reset code that stays valid for `valid_minutes`.
    async fn send_password_reset_otp(
        &self,
        user: &User,
        code: &str,
        valid_minutes: i64,
    ) -> Result<(), PortError>;

    /// Tell a freshly registered user their account exists. When the account
    /// was created with the default password it is passed along.
    async fn send_account_created(
        &self,
        user: &User,
        initial_password: Option<&str>,
    ) -> Result<(), PortError>;
}

/// Persistent storage for avatar images.
#[async_trait]
pub trait AvatarStorage: Send + Sync {
    /// Store `bytes` and return the stored name relative to the media root
    /// (e.g. `avatars/12_1712345678.png`).
    async fn save(&self, user_id: i32, extension: &str, bytes: &[u8]) -> Result<String, PortError>;

    /// Remove a previously stored file. Missing files are not an error.
    async fn delete(&self, name: &str) -> Result<(), PortError>;
}
