//! Password hashing utilities
//!
//! bcrypt is CPU-bound, so the async helpers move the work onto the blocking
//! pool instead of stalling the runtime.

use bcrypt::{hash, verify};

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password using bcrypt
    pub fn hash_password(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        hash(password, self.cost)
    }

    /// Verify a password against a hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
        verify(password, hash)
    }

    pub async fn hash_async(&self, password: &str) -> Result<String, String> {
        let hasher = *self;
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| format!("hashing task failed: {e}"))?
            .map_err(|e| e.to_string())
    }

    /// A malformed stored hash counts as a mismatch.
    pub async fn verify_async(&self, password: &str, hash: &str) -> Result<bool, String> {
        let hasher = *self;
        let password = password.to_owned();
        let hash = hash.to_owned();
        let outcome = tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
            .await
            .map_err(|e| format!("verification task failed: {e}"))?;
        Ok(outcome.unwrap_or(false))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
