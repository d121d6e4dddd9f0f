//! Session token issuer
//!
//! Lifecycle of a token: issued → valid → expired | rotated | revoked.
//! Validation runs signature → expiry → token kind → blacklist → user
//! existence → user status, and the first failing check names the error.

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{DomainError, DomainResult, User};
use crate::infrastructure::crypto::jwt::{create_token, verify_token};
use crate::infrastructure::crypto::{TokenClaims, TokenConfig, TokenType};
use crate::infrastructure::database::repositories::{BlacklistRepository, UserRepository};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token or bad signature: {0}")]
    Invalid(String),

    #[error("token has expired")]
    Expired,

    #[error("expected a {expected} token")]
    WrongType { expected: &'static str },

    #[error("token has been revoked")]
    Revoked,

    #[error("user {0} no longer exists")]
    UserNotFound(i32),

    #[error("user {0} is not active")]
    UserInactive(i32),

    #[error(transparent)]
    Storage(#[from] DomainError),
}

/// Freshly signed access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionTokenIssuer {
    db: DatabaseConnection,
    config: TokenConfig,
}

impl SessionTokenIssuer {
    pub fn new(db: DatabaseConnection, config: TokenConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn issue(&self, user: &User) -> DomainResult<TokenPair> {
        let access = TokenClaims::new(user.id, TokenType::Access, &self.config);
        let refresh = TokenClaims::new(user.id, TokenType::Refresh, &self.config);

        let sign = |claims: &TokenClaims| {
            create_token(claims, &self.config)
                .map_err(|e| DomainError::Internal(format!("failed to sign token: {e}")))
        };

        Ok(TokenPair {
            access_token: sign(&access)?,
            refresh_token: sign(&refresh)?,
            access_expires_at: access.expires_at(),
            refresh_expires_at: refresh.expires_at(),
        })
    }

    /// Stateless checks: signature, expiry, kind.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<TokenClaims, TokenError> {
        let claims =
            verify_token(token, &self.config).map_err(|e| TokenError::Invalid(e.to_string()))?;
        if claims.is_expired_at(Utc::now(), self.config.leeway_secs) {
            return Err(TokenError::Expired);
        }
        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected: expected.as_str(),
            });
        }
        Ok(claims)
    }

    async fn ensure_not_revoked(&self, claims: &TokenClaims) -> Result<(), TokenError> {
        if BlacklistRepository::new(&self.db).contains(&claims.jti).await? {
            return Err(TokenError::Revoked);
        }
        Ok(())
    }

    async fn active_user(&self, user_id: i32) -> Result<User, TokenError> {
        let user = UserRepository::new(&self.db)
            .find_by_id(user_id)
            .await?
            .ok_or(TokenError::UserNotFound(user_id))?;
        if !user.is_active() {
            return Err(TokenError::UserInactive(user_id));
        }
        Ok(user)
    }

    /// Full access-token validation, resolving the current user record.
    pub async fn authenticate(&self, token: &str) -> Result<(User, TokenClaims), TokenError> {
        let claims = self.decode(token, TokenType::Access)?;
        self.ensure_not_revoked(&claims).await?;
        let user = self.active_user(claims.user_id).await?;
        Ok((user, claims))
    }

    /// Validate a refresh token without consuming it.
    pub async fn inspect_refresh(&self, token: &str) -> Result<(User, TokenClaims), TokenError> {
        let claims = self.decode(token, TokenType::Refresh)?;
        self.ensure_not_revoked(&claims).await?;
        let user = self.active_user(claims.user_id).await?;
        Ok((user, claims))
    }

    /// Rotate-on-use: the presented refresh token is blacklisted and a new
    /// pair is issued. Of two concurrent refreshes with the same token only
    /// one succeeds.
    pub async fn refresh(&self, token: &str) -> Result<(User, TokenPair), TokenError> {
        let (user, claims) = self.inspect_refresh(token).await?;

        let claimed = BlacklistRepository::new(&self.db)
            .claim(
                &claims.jti,
                TokenType::Refresh.as_str(),
                Some(user.id),
                claims.expires_at(),
            )
            .await?;
        if !claimed {
            return Err(TokenError::Revoked);
        }

        let pair = self.issue(&user)?;
        debug!(user_id = user.id, "refresh token rotated");
        Ok((user, pair))
    }

    /// Blacklist a token. Malformed, expired and already-revoked tokens are
    /// silently accepted; storage failures are logged, never returned.
    pub async fn revoke(&self, token: &str, expected: TokenType) {
        let claims = match self.decode(token, expected) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(cause = %e, kind = expected.as_str(), "nothing to revoke");
                return;
            }
        };

        if let Err(e) = BlacklistRepository::new(&self.db)
            .claim(
                &claims.jti,
                expected.as_str(),
                Some(claims.user_id),
                claims.expires_at(),
            )
            .await
        {
            warn!(error = %e, kind = expected.as_str(), "failed to blacklist token");
        }
    }

    /// Delete blacklist rows whose tokens can no longer pass [`Self::decode`],
    /// i.e. expired for longer than the configured leeway.
    pub async fn purge_expired(&self) -> DomainResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.config.leeway_secs.max(0));
        BlacklistRepository::new(&self.db).purge_expired(cutoff).await
    }
}
