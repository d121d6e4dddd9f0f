//! Credential store: account identity, password hashes, role and status.
//!
//! Every method takes the connection to run on, so callers can place the
//! write inside a larger transaction together with its audit row.

use std::sync::Arc;

use sea_orm::ConnectionTrait;
use tokio::sync::OnceCell;

use crate::domain::user::{
    normalize_email, CreateUserDto, UpdateUserDto, MIN_PASSWORD_LENGTH,
};
use crate::domain::{DomainError, DomainResult, User};
use crate::infrastructure::crypto::PasswordHasher;
use crate::infrastructure::database::repositories::user_repository::DUPLICATE_EMAIL_MESSAGE;
use crate::infrastructure::database::repositories::UserRepository;

/// Account defaults applied at creation and reset time.
#[derive(Debug, Clone)]
pub struct AccountPolicy {
    /// Assigned when an account is created without a password or reset by
    /// an administrator.
    pub default_password: String,
    pub default_avatar: String,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            default_password: "password123".to_string(),
            default_avatar: "avatars/default.jpg".to_string(),
        }
    }
}

/// Reject passwords shorter than [`MIN_PASSWORD_LENGTH`] characters.
pub fn check_new_password(password: &str, field: &'static str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DomainError::PasswordTooShort {
            field,
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Checked against when the email is unknown so both failures cost one bcrypt run.
const DECOY_PASSWORD: &str = "regwatch-decoy-password";

#[derive(Debug, Clone)]
pub struct CredentialStore {
    hasher: PasswordHasher,
    policy: AccountPolicy,
    decoy_hash: Arc<OnceCell<String>>,
}

impl CredentialStore {
    pub fn new(hasher: PasswordHasher, policy: AccountPolicy) -> Self {
        Self {
            hasher,
            policy,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn policy(&self) -> &AccountPolicy {
        &self.policy
    }

    async fn hash(&self, password: &str) -> DomainResult<String> {
        self.hasher
            .hash_async(password)
            .await
            .map_err(DomainError::Internal)
    }

    /// Validate and hash a new password ahead of a transaction.
    pub async fn prepare_password(
        &self,
        password: &str,
        field: &'static str,
    ) -> DomainResult<String> {
        check_new_password(password, field)?;
        self.hash(password).await
    }

    pub async fn check_password(&self, user: &User, password: &str) -> DomainResult<bool> {
        self.hasher
            .verify_async(password, &user.password_hash)
            .await
            .map_err(DomainError::Internal)
    }

    /// Create an account. Without a password the default one is assigned and
    /// the account is flagged until its owner changes it.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        dto: CreateUserDto,
    ) -> DomainResult<User> {
        let users = UserRepository::new(conn);
        if users.email_taken(&dto.email, None).await? {
            return Err(DomainError::Conflict {
                field: "email",
                message: DUPLICATE_EMAIL_MESSAGE.to_string(),
            });
        }

        let (hash, using_default) = match dto.password.as_deref() {
            Some(password) => (self.prepare_password(password, "password").await?, false),
            None => (self.hash(&self.policy.default_password).await?, true),
        };

        users
            .insert(&dto, hash, using_default, &self.policy.default_avatar)
            .await
    }

    /// Look up by email and check the password. Unknown email and wrong
    /// password fail identically and both pay for a bcrypt verification.
    pub async fn verify<C: ConnectionTrait>(
        &self,
        conn: &C,
        email: &str,
        password: &str,
    ) -> DomainResult<User> {
        let Some(user) = UserRepository::new(conn).find_by_email(email).await? else {
            let decoy = self
                .decoy_hash
                .get_or_try_init(|| self.hash(DECOY_PASSWORD))
                .await?;
            self.hasher
                .verify_async(password, decoy)
                .await
                .map_err(DomainError::Internal)?;
            return Err(DomainError::InvalidCredentials);
        };
        if !self.check_password(&user, password).await? {
            return Err(DomainError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Apply a partial update. Nothing is written when no field changes.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        user: User,
        changes: &UpdateUserDto,
    ) -> DomainResult<User> {
        let users = UserRepository::new(conn);
        let mut updated = user.clone();

        if let Some(email) = changes.email.as_deref() {
            let email = normalize_email(email);
            if email != user.email && users.email_taken(&email, Some(user.id)).await? {
                return Err(DomainError::Conflict {
                    field: "email",
                    message: DUPLICATE_EMAIL_MESSAGE.to_string(),
                });
            }
            updated.email = email;
        }
        if let Some(first_name) = changes.first_name.as_deref() {
            updated.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = changes.last_name.as_deref() {
            updated.last_name = last_name.trim().to_string();
        }
        if let Some(middle_name) = changes.middle_name.as_deref() {
            updated.middle_name = middle_name.trim().to_string();
        }
        if let Some(level) = changes.user_level {
            updated.user_level = level;
        }
        if let Some(status) = changes.status {
            updated.status = status;
        }

        if !differs(&user, &updated) {
            return Ok(user);
        }
        users.save(&updated).await
    }

    /// Store an already prepared hash. Outstanding sessions stay valid.
    pub async fn store_password<C: ConnectionTrait>(
        &self,
        conn: &C,
        mut user: User,
        password_hash: String,
        using_default: bool,
    ) -> DomainResult<User> {
        user.password_hash = password_hash;
        user.using_default_password = using_default;
        UserRepository::new(conn).save(&user).await
    }

    /// Hash of the configured default password.
    pub async fn default_password_hash(&self) -> DomainResult<String> {
        self.hash(&self.policy.default_password).await
    }
}

fn differs(a: &User, b: &User) -> bool {
    a.email != b.email
        || a.first_name != b.first_name
        || a.last_name != b.last_name
        || a.middle_name != b.middle_name
        || a.user_level != b.user_level
        || a.status != b.status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UserLevel, UserStatus};
    use crate::infrastructure::database::test_support::memory_db;

    fn store() -> CredentialStore {
        CredentialStore::new(PasswordHasher::new(4), AccountPolicy::default())
    }

    fn dto(email: &str, password: Option<&str>) -> CreateUserDto {
        CreateUserDto {
            email: email.into(),
            first_name: "Jose".into(),
            last_name: "Rizal".into(),
            middle_name: String::new(),
            user_level: UserLevel::WaterQualityUnitHead,
            status: UserStatus::Active,
            password: password.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn create_without_password_uses_default() {
        let db = memory_db().await;
        let store = store();

        let user = store.create(&db, dto("jose@example.com", None)).await.unwrap();
        assert!(user.using_default_password);
        assert_ne!(user.password_hash, "password123");
        assert_eq!(user.avatar, "avatars/default.jpg");

        let verified = store.verify(&db, "JOSE@example.com", "password123").await.unwrap();
        assert_eq!(verified.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let db = memory_db().await;
        let store = store();
        store.create(&db, dto("jose@example.com", None)).await.unwrap();

        let err = store.create(&db, dto("Jose@Example.com", None)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { field: "email", .. }));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_fail_the_same_way() {
        let db = memory_db().await;
        let store = store();
        store
            .create(&db, dto("jose@example.com", Some("correct-horse")))
            .await
            .unwrap();

        assert!(!store.decoy_hash.initialized());
        let unknown = store.verify(&db, "nobody@example.com", "x").await.unwrap_err();
        assert!(store.decoy_hash.initialized());
        let wrong = store.verify(&db, "jose@example.com", "wrong-horse").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(wrong, DomainError::InvalidCredentials));
    }

    #[tokio::test]
    async fn short_explicit_password_is_rejected() {
        let db = memory_db().await;
        let err = store()
            .create(&db, dto("short@example.com", Some("1234567")))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PasswordTooShort { min: 8, .. }));
    }

    #[tokio::test]
    async fn update_rechecks_email_uniqueness_excluding_self() {
        let db = memory_db().await;
        let store = store();
        let a = store.create(&db, dto("a@example.com", None)).await.unwrap();
        store.create(&db, dto("b@example.com", None)).await.unwrap();

        let same = store
            .update(
                &db,
                a.clone(),
                &UpdateUserDto {
                    email: Some("A@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.updated_at, a.updated_at);

        let err = store
            .update(
                &db,
                a,
                &UpdateUserDto {
                    email: Some("b@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn new_password_enforces_length_and_clears_default_flag() {
        let db = memory_db().await;
        let store = store();
        let user = store.create(&db, dto("pw@example.com", None)).await.unwrap();

        let err = store.prepare_password("1234567", "new_password").await.unwrap_err();
        assert!(matches!(err, DomainError::PasswordTooShort { field: "new_password", .. }));

        let hash = store.prepare_password("12345678", "new_password").await.unwrap();
        let updated = store.store_password(&db, user, hash, false).await.unwrap();
        assert!(!updated.using_default_password);
        assert!(store.verify(&db, "pw@example.com", "12345678").await.is_ok());
        assert!(store.verify(&db, "pw@example.com", "password123").await.is_err());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(check_new_password("ññññññññ", "password").is_ok());
        assert!(check_new_password("ñññññññ", "password").is_err());
    }
}
