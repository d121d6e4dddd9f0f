//! JWT Token handling
//!
//! Tokens are HS256-signed and carry the numeric user id, the token kind and
//! a random `jti` used as the revocation key. Expiry is checked here rather
//! than by `jsonwebtoken` so that the deadline is exact: a token whose `exp`
//! equals the current second is already expired (plus configured leeway).

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token signing configuration
#[derive(Clone)]
pub struct TokenConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Issuer claim
    pub issuer: String,
    pub access_lifetime: Duration,
    pub refresh_lifetime: Duration,
    /// Grace period applied to the expiry check, in seconds.
    pub leeway_secs: i64,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_lifetime", &self.refresh_lifetime)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl TokenConfig {
    pub fn lifetime(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT TokenClaims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    pub user_id: i32,
    pub token_type: TokenType,
    /// Unique token id; the blacklist key.
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl TokenClaims {
    pub fn new(user_id: i32, token_type: TokenType, config: &TokenConfig) -> Self {
        let now = Utc::now();
        let exp = now + config.lifetime(token_type);

        Self {
            user_id,
            token_type,
            jti: uuid::Uuid::new_v4().simple().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }

    /// Expired once `now` reaches `exp + leeway`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway_secs: i64) -> bool {
        now.timestamp() >= self.exp.saturating_add(leeway_secs)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Sign claims into a compact JWT.
pub fn create_token(
    claims: &TokenClaims,
    config: &TokenConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify signature and issuer and decode the claims. Expiry is left to the
/// caller (see [`TokenClaims::is_expired_at`]).
pub fn verify_token(
    token: &str,
    config: &TokenConfig,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.validate_exp = false;
    validation.leeway = 0;

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig {
            secret: "test-secret-0123456789".into(),
            issuer: "regwatch-test".into(),
            access_lifetime: Duration::hours(5),
            refresh_lifetime: Duration::days(7),
            leeway_secs: 0,
        }
    }

    #[test]
    fn signed_token_decodes_to_same_claims() {
        let cfg = config();
        let claims = TokenClaims::new(42, TokenType::Refresh, &cfg);
        let token = create_token(&claims, &cfg).unwrap();

        let decoded = verify_token(&token, &cfg).unwrap();
        assert_eq!(decoded.user_id, 42);
        assert_eq!(decoded.token_type, TokenType::Refresh);
        assert_eq!(decoded.jti, claims.jti);
        assert_eq!(decoded.exp - decoded.iat, Duration::days(7).num_seconds());
    }

    #[test]
    fn wrong_secret_fails_signature_check() {
        let cfg = config();
        let token = create_token(&TokenClaims::new(1, TokenType::Access, &cfg), &cfg).unwrap();

        let mut other = config();
        other.secret = "another-secret-0123456789".into();
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn expired_token_still_decodes_but_reports_expiry() {
        let cfg = config();
        let mut claims = TokenClaims::new(1, TokenType::Access, &cfg);
        claims.exp = Utc::now().timestamp() - 10;
        let token = create_token(&claims, &cfg).unwrap();

        let decoded = verify_token(&token, &cfg).unwrap();
        assert!(decoded.is_expired_at(Utc::now(), 0));
        assert!(!decoded.is_expired_at(Utc::now(), 3600));
    }

    #[test]
    fn expiry_second_itself_is_expired() {
        let cfg = config();
        let claims = TokenClaims::new(1, TokenType::Access, &cfg);
        let at_exp = Utc.timestamp_opt(claims.exp, 0).unwrap();
        assert!(claims.is_expired_at(at_exp, 0));
        assert!(!claims.is_expired_at(at_exp - Duration::seconds(1), 0));
    }

    #[test]
    fn each_token_gets_a_fresh_jti() {
        let cfg = config();
        let a = TokenClaims::new(1, TokenType::Access, &cfg);
        let b = TokenClaims::new(1, TokenType::Access, &cfg);
        assert_ne!(a.jti, b.jti);
    }
}
