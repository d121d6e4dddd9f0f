//! Auth gateway
//!
//! Entry point for every account operation exposed over HTTP. It applies the
//! authorization rules (administrator gates, self-targeting restrictions),
//! runs each mutation and its audit row in one transaction, and calls the
//! outbound collaborators (notifier, avatar storage) once the database work
//! has committed.

use std::sync::Arc;

use metrics::counter;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::audit::{ActivityLogEntry, AuditLogger};
use super::context::ClientContext;
use super::credentials::{AccountPolicy, CredentialStore};
use super::password_reset::{OtpResetBroker, ResetPolicy};
use super::tokens::{SessionTokenIssuer, TokenError, TokenPair};
use crate::application::ports::{AvatarStorage, Notifier};
use crate::domain::user::{CreateUserDto, GetUserDto, UpdateProfileDto, UpdateUserDto};
use crate::domain::{
    ActivityAction, ActivityLogFilter, DomainError, DomainResult, NewActivityLog, User,
    UserStatus,
};
use crate::infrastructure::crypto::{PasswordHasher, TokenConfig, TokenType};
use crate::infrastructure::database::repositories::UserRepository;
use crate::shared::{PaginatedResult, PaginationParams};

pub const ADMIN_ONLY_MESSAGE: &str = "You do not have permission to perform this action.";
pub const INVALID_REFRESH_MESSAGE: &str = "Invalid refresh token";

/// Everything the gateway needs from configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub tokens: TokenConfig,
    pub account: AccountPolicy,
    pub reset: ResetPolicy,
    pub bcrypt_cost: u32,
    pub max_avatar_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub user: User,
    pub notification_sent: bool,
}

/// Uploaded picture as received from the client.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct AuthGateway {
    db: DatabaseConnection,
    credentials: CredentialStore,
    tokens: SessionTokenIssuer,
    resets: OtpResetBroker,
    audit: AuditLogger,
    notifier: Arc<dyn Notifier>,
    avatars: Arc<dyn AvatarStorage>,
    max_avatar_bytes: usize,
}

impl AuthGateway {
    pub fn new(
        db: DatabaseConnection,
        config: IdentityConfig,
        notifier: Arc<dyn Notifier>,
        avatars: Arc<dyn AvatarStorage>,
    ) -> Self {
        let credentials =
            CredentialStore::new(PasswordHasher::new(config.bcrypt_cost), config.account);
        let audit = AuditLogger::new(db.clone());
        let resets = OtpResetBroker::new(
            db.clone(),
            credentials.clone(),
            audit.clone(),
            notifier.clone(),
            config.reset,
        );
        Self {
            tokens: SessionTokenIssuer::new(db.clone(), config.tokens),
            db,
            credentials,
            resets,
            audit,
            notifier,
            avatars,
            max_avatar_bytes: config.max_avatar_bytes,
        }
    }

    pub fn tokens(&self) -> &SessionTokenIssuer {
        &self.tokens
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Administrator gate shared by the gateway and the HTTP layer.
    pub fn require_admin(caller: &User) -> DomainResult<()> {
        if !caller.is_administrator() {
            return Err(DomainError::Forbidden(ADMIN_ONLY_MESSAGE.to_string()));
        }
        Ok(())
    }

    // ── Session ─────────────────────────────────────────────────

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ctx: &ClientContext,
    ) -> DomainResult<LoginOutcome> {
        let user = match self.credentials.verify(&self.db, email, password).await {
            Ok(user) => user,
            Err(e) => {
                if matches!(e, DomainError::InvalidCredentials) {
                    counter!("auth_login_total", "outcome" => "invalid_credentials").increment(1);
                }
                return Err(e);
            }
        };
        if !user.is_active() {
            counter!("auth_login_total", "outcome" => "inactive").increment(1);
            return Err(DomainError::AccountInactive);
        }

        let tokens = self.tokens.issue(&user)?;

        let txn = self.db.begin().await?;
        UserRepository::new(&txn).touch_last_login(user.id).await?;
        self.audit
            .record(
                &txn,
                NewActivityLog::new(ActivityAction::Login)
                    .user(user.id)
                    .detail("ip_address", ctx.ip_or_unknown())
                    .detail("user_agent", ctx.user_agent.clone().unwrap_or_default())
                    .detail("using_default_password", user.using_default_password),
            )
            .await?;
        txn.commit().await?;

        counter!("auth_login_total", "outcome" => "success").increment(1);
        info!(user_id = user.id, "user logged in");
        Ok(LoginOutcome { user, tokens })
    }

    /// Exchange a refresh token for a new pair. Token-level failures are
    /// collapsed into one client-facing error; the cause is only logged.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> DomainResult<(User, TokenPair)> {
        let Some(token) = refresh_token.filter(|t| !t.is_empty()) else {
            return Err(DomainError::InvalidToken("Refresh token not found".to_string()));
        };

        match self.tokens.refresh(token).await {
            Ok(result) => {
                counter!("auth_refresh_total", "outcome" => "success").increment(1);
                Ok(result)
            }
            Err(TokenError::UserNotFound(id)) => {
                warn!(user_id = id, "refresh for deleted user");
                Err(DomainError::user_not_found("id", id))
            }
            Err(TokenError::UserInactive(id)) => {
                warn!(user_id = id, "refresh for inactive user");
                Err(DomainError::AccountInactive)
            }
            Err(TokenError::Storage(e)) => Err(e),
            Err(cause) => {
                counter!("auth_refresh_total", "outcome" => "rejected").increment(1);
                warn!(%cause, "refresh token rejected");
                Err(DomainError::InvalidToken(INVALID_REFRESH_MESSAGE.to_string()))
            }
        }
    }

    /// Revoke whatever tokens were presented and record the logout when the
    /// caller can be identified. Never fails.
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        ctx: &ClientContext,
    ) {
        let mut user_id = None;
        if let Some(token) = access_token {
            if let Ok((user, _)) = self.tokens.authenticate(token).await {
                user_id = Some(user.id);
            }
        }
        if user_id.is_none() {
            if let Some(token) = refresh_token {
                if let Ok((user, _)) = self.tokens.inspect_refresh(token).await {
                    user_id = Some(user.id);
                }
            }
        }

        if let Some(token) = refresh_token {
            self.tokens.revoke(token, TokenType::Refresh).await;
        }
        if let Some(token) = access_token {
            self.tokens.revoke(token, TokenType::Access).await;
        }

        let Some(user_id) = user_id else {
            debug!("logout without an identifiable session");
            return;
        };
        let entry = NewActivityLog::new(ActivityAction::Logout)
            .user(user_id)
            .detail("ip_address", ctx.ip_or_unknown())
            .detail("user_agent", ctx.user_agent.clone().unwrap_or_default());
        if let Err(e) = self.audit.record(&self.db, entry).await {
            warn!(user_id, error = %e, "failed to record logout");
        }
        info!(user_id, "user logged out");
    }

    // ── Password reset ──────────────────────────────────────────

    pub async fn request_password_reset(
        &self,
        email: &str,
        ctx: &ClientContext,
    ) -> DomainResult<()> {
        self.resets.request_reset(email, ctx).await
    }

    pub async fn verify_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
        ctx: &ClientContext,
    ) -> DomainResult<()> {
        self.resets
            .verify_and_reset(email, code, new_password, ctx)
            .await
    }

    // ── Administration ──────────────────────────────────────────

    pub async fn register(
        &self,
        caller: &User,
        dto: CreateUserDto,
    ) -> DomainResult<RegisterOutcome> {
        Self::require_admin(caller)?;

        let txn = self.db.begin().await?;
        let user = self.credentials.create(&txn, dto).await?;
        self.audit
            .record(
                &txn,
                NewActivityLog::new(ActivityAction::UserCreated)
                    .admin(caller.id)
                    .user(user.id)
                    .detail("email", user.email.clone())
                    .detail("user_level", user.user_level.as_str())
                    .detail("status", user.status.as_str())
                    .detail("first_name", user.first_name.clone())
                    .detail("last_name", user.last_name.clone()),
            )
            .await?;
        txn.commit().await?;
        info!(admin_id = caller.id, user_id = user.id, "user registered");

        let initial_password = user
            .using_default_password
            .then(|| self.credentials.policy().default_password.as_str());
        let notification_sent = match self
            .notifier
            .send_account_created(&user, initial_password)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "account notification failed");
                false
            }
        };

        Ok(RegisterOutcome {
            user,
            notification_sent,
        })
    }

    pub async fn list_users(
        &self,
        caller: &User,
        mut filter: GetUserDto,
    ) -> DomainResult<Vec<User>> {
        Self::require_admin(caller)?;
        filter.exclude_id = Some(caller.id);
        UserRepository::new(&self.db).list(&filter).await
    }

    /// Partial update by an administrator. A status change is recorded as
    /// `status_changed`; every other changed field goes into one
    /// `user_updated` row.
    pub async fn update_user(
        &self,
        caller: &User,
        target_id: i32,
        changes: UpdateUserDto,
    ) -> DomainResult<User> {
        Self::require_admin(caller)?;

        let txn = self.db.begin().await?;
        let before = UserRepository::new(&txn)
            .find_by_id_for_update(target_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found("id", target_id))?;

        if before.id == caller.id {
            if changes.user_level.is_some_and(|level| level != before.user_level) {
                return Err(DomainError::CannotModifySelf(
                    "You cannot change your own user level".to_string(),
                ));
            }
            if changes.status.is_some_and(|status| status != before.status) {
                return Err(DomainError::CannotModifySelf(
                    "You cannot change your own status".to_string(),
                ));
            }
        }

        let after = self.credentials.update(&txn, before.clone(), &changes).await?;

        if before.status != after.status {
            self.audit
                .record(&txn, status_changed_entry(caller, &before, &after))
                .await?;
        }
        let diff = field_changes(&before, &after);
        if !diff.is_empty() {
            self.audit
                .record(
                    &txn,
                    NewActivityLog::new(ActivityAction::UserUpdated)
                        .admin(caller.id)
                        .user(after.id)
                        .detail("changes", Value::Object(diff)),
                )
                .await?;
        }
        txn.commit().await?;

        debug!(admin_id = caller.id, user_id = after.id, "user updated");
        Ok(after)
    }

    pub async fn change_status(
        &self,
        caller: &User,
        target_id: i32,
        status: &str,
    ) -> DomainResult<User> {
        Self::require_admin(caller)?;
        if target_id == caller.id {
            return Err(DomainError::CannotModifySelf(
                "You cannot change your own status".to_string(),
            ));
        }
        let status: UserStatus = status
            .parse()
            .map_err(|_| DomainError::invalid("status", "Invalid status value"))?;

        let txn = self.db.begin().await?;
        let before = UserRepository::new(&txn)
            .find_by_id_for_update(target_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found("id", target_id))?;

        let changes = UpdateUserDto {
            status: Some(status),
            ..Default::default()
        };
        let after = self.credentials.update(&txn, before.clone(), &changes).await?;
        if before.status != after.status {
            self.audit
                .record(&txn, status_changed_entry(caller, &before, &after))
                .await?;
        }
        txn.commit().await?;

        info!(
            admin_id = caller.id,
            user_id = after.id,
            status = %after.status,
            "user status changed"
        );
        Ok(after)
    }

    /// Delete an account. The audit row keeps a snapshot of the removed
    /// account since its subject link is cleared with the row.
    pub async fn delete_user(&self, caller: &User, target_id: i32) -> DomainResult<()> {
        Self::require_admin(caller)?;
        if target_id == caller.id {
            return Err(DomainError::CannotModifySelf(
                "You cannot delete your own account".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let users = UserRepository::new(&txn);
        let target = users
            .find_by_id_for_update(target_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found("id", target_id))?;

        self.audit
            .record(
                &txn,
                NewActivityLog::new(ActivityAction::UserDeleted)
                    .admin(caller.id)
                    .user(target.id)
                    .detail("user_id", target.id)
                    .detail("email", target.email.clone())
                    .detail("user_level", target.user_level.as_str())
                    .detail("full_name", target.full_name()),
            )
            .await?;
        users.delete(target.id).await?;
        txn.commit().await?;
        info!(admin_id = caller.id, user_id = target.id, "user deleted");

        if let Err(e) = self.avatars.delete(&target.avatar).await {
            warn!(user_id = target.id, error = %e, "failed to remove avatar of deleted user");
        }
        Ok(())
    }

    /// Reset another account to the default password after the administrator
    /// re-enters their own password.
    pub async fn admin_reset_password(
        &self,
        caller: &User,
        admin_password: &str,
        email: &str,
        ctx: &ClientContext,
    ) -> DomainResult<User> {
        Self::require_admin(caller)?;

        if admin_password.is_empty()
            || !self.credentials.check_password(caller, admin_password).await?
        {
            self.audit
                .record(
                    &self.db,
                    NewActivityLog::new(ActivityAction::AdminPasswordVerificationFailed)
                        .admin(caller.id)
                        .detail("target_email", email.trim().to_lowercase())
                        .detail("ip_address", ctx.ip_or_unknown()),
                )
                .await?;
            warn!(admin_id = caller.id, "admin password confirmation failed");
            return Err(DomainError::invalid(
                "admin_password",
                "Admin password is incorrect",
            ));
        }

        if email.trim().is_empty() {
            return Err(DomainError::invalid("email", "Email is required"));
        }

        let hash = self.credentials.default_password_hash().await?;

        let txn = self.db.begin().await?;
        let Some(target) = UserRepository::new(&txn).find_by_email_for_update(email).await? else {
            txn.rollback().await?;
            self.audit
                .record(
                    &self.db,
                    NewActivityLog::new(ActivityAction::PasswordResetAttemptFailed)
                        .admin(caller.id)
                        .detail("target_email", email.trim().to_lowercase())
                        .detail("reason", "user_not_found"),
                )
                .await?;
            return Err(DomainError::user_not_found("email", email.trim()));
        };

        let target = self
            .credentials
            .store_password(&txn, target, hash, true)
            .await?;
        self.audit
            .record(
                &txn,
                NewActivityLog::new(ActivityAction::PasswordReset)
                    .admin(caller.id)
                    .user(target.id)
                    .detail("email", target.email.clone())
                    .detail("full_name", target.full_name())
                    .detail("reset_to_default", true),
            )
            .await?;
        txn.commit().await?;

        info!(admin_id = caller.id, user_id = target.id, "password reset to default");
        Ok(target)
    }

    pub async fn activity_logs(
        &self,
        caller: &User,
        filter: &ActivityLogFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<ActivityLogEntry>> {
        Self::require_admin(caller)?;
        self.audit.query(filter, params).await
    }

    // ── Own account ─────────────────────────────────────────────

    /// Update the caller's own names, email and optionally password. A new
    /// password requires the current one.
    pub async fn update_own_profile(
        &self,
        caller: &User,
        dto: UpdateProfileDto,
    ) -> DomainResult<User> {
        let new_hash = match dto.new_password.as_deref().filter(|p| !p.is_empty()) {
            Some(new_password) => {
                let current = dto
                    .current_password
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| {
                        DomainError::invalid(
                            "current_password",
                            "Current password is required to set a new password",
                        )
                    })?;
                if !self.credentials.check_password(caller, current).await? {
                    return Err(DomainError::invalid(
                        "current_password",
                        "Current password is incorrect",
                    ));
                }
                Some(
                    self.credentials
                        .prepare_password(new_password, "new_password")
                        .await?,
                )
            }
            None => None,
        };

        let changes = UpdateUserDto {
            email: dto.email,
            first_name: dto.first_name,
            last_name: dto.last_name,
            middle_name: dto.middle_name,
            ..Default::default()
        };

        let txn = self.db.begin().await?;
        let current = UserRepository::new(&txn)
            .find_by_id_for_update(caller.id)
            .await?
            .ok_or_else(|| DomainError::user_not_found("id", caller.id))?;
        let before = current.clone();
        let mut user = self.credentials.update(&txn, current, &changes).await?;
        let password_changed = new_hash.is_some();
        if let Some(hash) = new_hash {
            user = self.credentials.store_password(&txn, user, hash, false).await?;
        }

        let diff = field_changes(&before, &user);
        if !diff.is_empty() || password_changed {
            self.audit
                .record(
                    &txn,
                    NewActivityLog::new(ActivityAction::ProfileUpdated)
                        .user(user.id)
                        .detail("changes", diff)
                        .detail("password_changed", password_changed),
                )
                .await?;
        }
        txn.commit().await?;

        debug!(user_id = user.id, "profile updated");
        Ok(user)
    }

    /// Replace the caller's avatar. The previous file is removed unless it is
    /// the shared default picture.
    pub async fn update_avatar(&self, caller: &User, upload: AvatarUpload) -> DomainResult<User> {
        if upload.bytes.is_empty() {
            return Err(DomainError::invalid("avatar", "No avatar file provided"));
        }
        if upload.bytes.len() > self.max_avatar_bytes {
            return Err(DomainError::invalid(
                "avatar",
                format!(
                    "Avatar file size must be less than {}MB",
                    self.max_avatar_bytes / (1024 * 1024)
                ),
            ));
        }
        let Some(extension) = avatar_extension(&upload.content_type) else {
            return Err(DomainError::invalid(
                "avatar",
                "Avatar must be a JPEG, PNG, or GIF image",
            ));
        };

        let stored = self
            .avatars
            .save(caller.id, extension, &upload.bytes)
            .await
            .map_err(|e| DomainError::Internal(format!("failed to store avatar: {e}")))?;

        match self.persist_avatar(caller, &stored, &upload).await {
            Ok((user, previous)) => {
                if previous != stored {
                    if let Err(e) = self.avatars.delete(&previous).await {
                        warn!(user_id = user.id, error = %e, "failed to remove previous avatar");
                    }
                }
                Ok(user)
            }
            Err(e) => {
                if let Err(cleanup) = self.avatars.delete(&stored).await {
                    warn!(error = %cleanup, "failed to remove orphaned avatar");
                }
                Err(e)
            }
        }
    }

    async fn persist_avatar(
        &self,
        caller: &User,
        stored: &str,
        upload: &AvatarUpload,
    ) -> DomainResult<(User, String)> {
        let txn = self.db.begin().await?;
        let users = UserRepository::new(&txn);
        let mut user = users
            .find_by_id_for_update(caller.id)
            .await?
            .ok_or_else(|| DomainError::user_not_found("id", caller.id))?;

        let previous = std::mem::replace(&mut user.avatar, stored.to_string());
        let user = users.save(&user).await?;
        self.audit
            .record(
                &txn,
                NewActivityLog::new(ActivityAction::AvatarUpdated)
                    .user(user.id)
                    .detail(
                        "avatar_file",
                        upload.file_name.clone().unwrap_or_else(|| stored.to_string()),
                    )
                    .detail("file_size", upload.bytes.len()),
            )
            .await?;
        txn.commit().await?;
        Ok((user, previous))
    }
}

fn status_changed_entry(caller: &User, before: &User, after: &User) -> NewActivityLog {
    NewActivityLog::new(ActivityAction::StatusChanged)
        .admin(caller.id)
        .user(after.id)
        .detail("from", before.status.as_str())
        .detail("to", after.status.as_str())
        .detail("email", after.email.clone())
        .detail("full_name", after.full_name())
}

/// `{field: {from, to}}` for every changed field other than status.
fn field_changes(before: &User, after: &User) -> Map<String, Value> {
    let pairs = [
        ("email", before.email.as_str(), after.email.as_str()),
        ("first_name", before.first_name.as_str(), after.first_name.as_str()),
        ("last_name", before.last_name.as_str(), after.last_name.as_str()),
        ("middle_name", before.middle_name.as_str(), after.middle_name.as_str()),
        (
            "user_level",
            before.user_level.as_str(),
            after.user_level.as_str(),
        ),
    ];

    pairs
        .into_iter()
        .filter(|(_, from, to)| from != to)
        .map(|(field, from, to)| (field.to_string(), json!({ "from": from, "to": to })))
        .collect()
}

fn avatar_extension(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::application::identity::password_reset::tests::RecordingNotifier;
    use crate::application::ports::PortError;
    use crate::domain::{ActivityLog, UserLevel};
    use crate::infrastructure::database::repositories::ActivityLogRepository;
    use crate::infrastructure::database::test_support::memory_db;

    #[derive(Default)]
    struct MemoryAvatars {
        saved: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AvatarStorage for MemoryAvatars {
        async fn save(
            &self,
            user_id: i32,
            extension: &str,
            _bytes: &[u8],
        ) -> Result<String, PortError> {
            let mut saved = self.saved.lock().unwrap();
            let name = format!("avatars/{user_id}_{}.{extension}", saved.len());
            saved.push(name.clone());
            Ok(name)
        }

        async fn delete(&self, name: &str) -> Result<(), PortError> {
            if name != "avatars/default.jpg" {
                self.deleted.lock().unwrap().push(name.to_string());
            }
            Ok(())
        }
    }

    struct Fixture {
        gateway: AuthGateway,
        db: DatabaseConnection,
        notifier: Arc<RecordingNotifier>,
        avatars: Arc<MemoryAvatars>,
        admin: User,
    }

    fn config() -> IdentityConfig {
        IdentityConfig {
            tokens: TokenConfig {
                secret: "gateway-test-secret-000".into(),
                issuer: "regwatch-test".into(),
                access_lifetime: Duration::hours(5),
                refresh_lifetime: Duration::days(7),
                leeway_secs: 0,
            },
            account: AccountPolicy::default(),
            reset: ResetPolicy::default(),
            bcrypt_cost: 4,
            max_avatar_bytes: 1024,
        }
    }

    fn new_user(email: &str, level: UserLevel, password: Option<&str>) -> CreateUserDto {
        CreateUserDto {
            email: email.into(),
            first_name: "Ana".into(),
            last_name: "Reyes".into(),
            middle_name: String::new(),
            user_level: level,
            status: UserStatus::Active,
            password: password.map(Into::into),
        }
    }

    async fn fixture() -> Fixture {
        let db = memory_db().await;
        let notifier = Arc::new(RecordingNotifier::default());
        let avatars = Arc::new(MemoryAvatars::default());
        let gateway = AuthGateway::new(db.clone(), config(), notifier.clone(), avatars.clone());
        let admin = gateway
            .credentials()
            .create(
                &db,
                new_user("admin@example.com", UserLevel::Administrator, Some("admin-pass")),
            )
            .await
            .unwrap();
        Fixture {
            gateway,
            db,
            notifier,
            avatars,
            admin,
        }
    }

    async fn staff(f: &Fixture, email: &str) -> User {
        f.gateway
            .register(
                &f.admin,
                new_user(email, UserLevel::WaterQualityUnitHead, Some("staff-pass")),
            )
            .await
            .unwrap()
            .user
    }

    async fn logs(db: &DatabaseConnection, action: ActivityAction) -> Vec<ActivityLog> {
        ActivityLogRepository::new(db)
            .query(
                &ActivityLogFilter {
                    action: Some(action),
                    ..Default::default()
                },
                &[],
                PaginationParams::from_query(None, Some(100)),
            )
            .await
            .unwrap()
            .items
    }

    #[tokio::test]
    async fn login_records_client_and_default_password_flag() {
        let f = fixture().await;
        let ctx = ClientContext {
            ip: Some("10.0.0.7".into()),
            user_agent: Some("curl/8".into()),
        };

        let outcome = f.gateway.login("ADMIN@example.com", "admin-pass", &ctx).await.unwrap();
        assert_eq!(outcome.user.id, f.admin.id);

        let rows = logs(&f.db, ActivityAction::Login).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].details["ip_address"], "10.0.0.7");
        assert_eq!(rows[0].details["using_default_password"], false);
    }

    #[tokio::test]
    async fn inactive_account_cannot_log_in_and_loses_its_session() {
        let f = fixture().await;
        let user = staff(&f, "staff@example.com").await;
        let ctx = ClientContext::default();
        let session = f.gateway.login("staff@example.com", "staff-pass", &ctx).await.unwrap();

        f.gateway
            .change_status(&f.admin, user.id, "inactive")
            .await
            .unwrap();

        let err = f.gateway.login("staff@example.com", "staff-pass", &ctx).await.unwrap_err();
        assert!(matches!(err, DomainError::AccountInactive));
        assert!(f
            .gateway
            .tokens()
            .authenticate(&session.tokens.access_token)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let f = fixture().await;
        let ctx = ClientContext::default();
        let a = f.gateway.login("admin@example.com", "nope", &ctx).await.unwrap_err();
        let b = f.gateway.login("ghost@example.com", "nope", &ctx).await.unwrap_err();
        assert_eq!(a.to_string(), b.to_string());
    }

    #[tokio::test]
    async fn refresh_failures_are_normalized() {
        let f = fixture().await;
        let missing = f.gateway.refresh(None).await.unwrap_err();
        assert!(matches!(missing, DomainError::InvalidToken(_)));

        let garbage = f.gateway.refresh(Some("garbage")).await.unwrap_err();
        assert_eq!(garbage.to_string(), INVALID_REFRESH_MESSAGE);
    }

    #[tokio::test]
    async fn logout_twice_is_harmless() {
        let f = fixture().await;
        let ctx = ClientContext::default();
        let session = f.gateway.login("admin@example.com", "admin-pass", &ctx).await.unwrap();
        let access = session.tokens.access_token.as_str();
        let refresh = session.tokens.refresh_token.as_str();

        f.gateway.logout(Some(access), Some(refresh), &ctx).await;
        f.gateway.logout(Some(access), Some(refresh), &ctx).await;

        assert_eq!(logs(&f.db, ActivityAction::Logout).await.len(), 1);
        assert!(f.gateway.refresh(Some(refresh)).await.is_err());
        assert!(f.gateway.tokens().authenticate(access).await.is_err());
    }

    #[tokio::test]
    async fn register_requires_administrator() {
        let f = fixture().await;
        let user = staff(&f, "staff@example.com").await;

        let err = f
            .gateway
            .register(&user, new_user("x@example.com", UserLevel::DivisionChief, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert!(matches!(
            f.gateway.list_users(&user, GetUserDto::default()).await.unwrap_err(),
            DomainError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn register_without_password_uses_default_and_notifies() {
        let f = fixture().await;
        let outcome = f
            .gateway
            .register(&f.admin, new_user("new@example.com", UserLevel::DivisionChief, None))
            .await
            .unwrap();

        assert!(outcome.user.using_default_password);
        assert!(outcome.notification_sent);
        assert_eq!(f.notifier.created.lock().unwrap().as_slice(), ["new@example.com"]);

        let created = logs(&f.db, ActivityAction::UserCreated).await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].details["user_level"], "division_chief");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let f = fixture().await;
        staff(&f, "dup@example.com").await;
        let err = f
            .gateway
            .register(&f.admin, new_user("DUP@example.com", UserLevel::DivisionChief, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { field: "email", .. }));
    }

    #[tokio::test]
    async fn list_excludes_caller() {
        let f = fixture().await;
        staff(&f, "b@example.com").await;
        staff(&f, "a@example.com").await;

        let users = f.gateway.list_users(&f.admin, GetUserDto::default()).await.unwrap();
        let emails: Vec<_> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, ["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn status_only_update_logs_a_single_status_change() {
        let f = fixture().await;
        let user = staff(&f, "staff@example.com").await;

        f.gateway
            .update_user(
                &f.admin,
                user.id,
                UpdateUserDto {
                    status: Some(UserStatus::Inactive),
                    first_name: Some("Ana".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let changed = logs(&f.db, ActivityAction::StatusChanged).await;
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].details["from"], "active");
        assert_eq!(changed[0].details["to"], "inactive");
        assert!(logs(&f.db, ActivityAction::UserUpdated).await.is_empty());
    }

    #[tokio::test]
    async fn field_update_logs_only_changed_fields() {
        let f = fixture().await;
        let user = staff(&f, "staff@example.com").await;

        f.gateway
            .update_user(
                &f.admin,
                user.id,
                UpdateUserDto {
                    last_name: Some("Santos".into()),
                    email: Some("staff@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let updated = logs(&f.db, ActivityAction::UserUpdated).await;
        assert_eq!(updated.len(), 1);
        let changes = updated[0].details["changes"].as_object().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["last_name"]["from"], "Reyes");
        assert_eq!(changes["last_name"]["to"], "Santos");
    }

    #[tokio::test]
    async fn noop_update_writes_no_log() {
        let f = fixture().await;
        let user = staff(&f, "staff@example.com").await;
        f.gateway
            .update_user(&f.admin, user.id, UpdateUserDto::default())
            .await
            .unwrap();
        assert!(logs(&f.db, ActivityAction::UserUpdated).await.is_empty());
    }

    #[tokio::test]
    async fn admin_cannot_demote_or_delete_self() {
        let f = fixture().await;
        let err = f
            .gateway
            .update_user(
                &f.admin,
                f.admin.id,
                UpdateUserDto {
                    user_level: Some(UserLevel::DivisionChief),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CannotModifySelf(_)));

        let err = f.gateway.delete_user(&f.admin, f.admin.id).await.unwrap_err();
        assert!(matches!(err, DomainError::CannotModifySelf(_)));
        assert!(UserRepository::new(&f.db).find_by_id(f.admin.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn change_status_rejects_unknown_values() {
        let f = fixture().await;
        let user = staff(&f, "staff@example.com").await;
        let err = f
            .gateway
            .change_status(&f.admin, user.id, "suspended")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_keeps_a_snapshot_in_the_log() {
        let f = fixture().await;
        let user = staff(&f, "gone@example.com").await;

        f.gateway.delete_user(&f.admin, user.id).await.unwrap();

        assert!(UserRepository::new(&f.db).find_by_id(user.id).await.unwrap().is_none());
        let deleted = logs(&f.db, ActivityAction::UserDeleted).await;
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].details["email"], "gone@example.com");
        assert_eq!(deleted[0].details["full_name"], "Ana Reyes");

        let missing = f.gateway.delete_user(&f.admin, user.id).await.unwrap_err();
        assert!(matches!(missing, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn admin_reset_requires_step_up_and_records_outcomes() {
        let f = fixture().await;
        let ctx = ClientContext::default();
        staff(&f, "staff@example.com").await;

        let err = f
            .gateway
            .admin_reset_password(&f.admin, "wrong", "staff@example.com", &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            logs(&f.db, ActivityAction::AdminPasswordVerificationFailed).await.len(),
            1
        );

        let err = f
            .gateway
            .admin_reset_password(&f.admin, "admin-pass", "ghost@example.com", &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        let failed = logs(&f.db, ActivityAction::PasswordResetAttemptFailed).await;
        assert_eq!(failed[0].details["reason"], "user_not_found");

        let target = f
            .gateway
            .admin_reset_password(&f.admin, "admin-pass", "staff@example.com", &ctx)
            .await
            .unwrap();
        assert!(target.using_default_password);
        let reset = logs(&f.db, ActivityAction::PasswordReset).await;
        assert_eq!(reset[0].details["reset_to_default"], true);

        assert!(f
            .gateway
            .login("staff@example.com", "password123", &ctx)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn profile_password_change_needs_current_password() {
        let f = fixture().await;
        let user = staff(&f, "staff@example.com").await;

        let missing = f
            .gateway
            .update_own_profile(
                &user,
                UpdateProfileDto {
                    new_password: Some("new-password".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(missing, DomainError::Validation(_)));

        let short = f
            .gateway
            .update_own_profile(
                &user,
                UpdateProfileDto {
                    current_password: Some("staff-pass".into()),
                    new_password: Some("1234567".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(short, DomainError::PasswordTooShort { .. }));

        let updated = f
            .gateway
            .update_own_profile(
                &user,
                UpdateProfileDto {
                    first_name: Some("Anabel".into()),
                    current_password: Some("staff-pass".into()),
                    new_password: Some("12345678".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Anabel");
        assert!(f
            .gateway
            .login("staff@example.com", "12345678", &ClientContext::default())
            .await
            .is_ok());

        let rows = logs(&f.db, ActivityAction::ProfileUpdated).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].details["changes"]["first_name"]["to"], "Anabel");
        assert!(rows[0].details["changes"].get("last_name").is_none());
        assert_eq!(rows[0].details["password_changed"], true);
    }

    #[tokio::test]
    async fn resubmitting_unchanged_profile_writes_no_log() {
        let f = fixture().await;
        let user = staff(&f, "staff@example.com").await;

        let same = f
            .gateway
            .update_own_profile(
                &user,
                UpdateProfileDto {
                    email: Some(user.email.to_uppercase()),
                    first_name: Some(user.first_name.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.first_name, user.first_name);
        assert!(logs(&f.db, ActivityAction::ProfileUpdated).await.is_empty());
    }

    #[tokio::test]
    async fn avatar_replacement_removes_previous_upload() {
        let f = fixture().await;
        let upload = |content_type: &str| AvatarUpload {
            file_name: Some("me.png".into()),
            content_type: content_type.into(),
            bytes: vec![1, 2, 3],
        };

        let bad = f.gateway.update_avatar(&f.admin, upload("text/plain")).await.unwrap_err();
        assert!(matches!(bad, DomainError::Validation(_)));

        let first = f.gateway.update_avatar(&f.admin, upload("image/png")).await.unwrap();
        assert!(f.avatars.deleted.lock().unwrap().is_empty());

        let second = f.gateway.update_avatar(&f.admin, upload("image/gif")).await.unwrap();
        assert_ne!(first.avatar, second.avatar);
        assert_eq!(f.avatars.deleted.lock().unwrap().as_slice(), [first.avatar.clone()]);
        assert_eq!(logs(&f.db, ActivityAction::AvatarUpdated).await.len(), 2);
    }

    #[tokio::test]
    async fn oversized_avatar_is_rejected() {
        let f = fixture().await;
        let err = f
            .gateway
            .update_avatar(
                &f.admin,
                AvatarUpload {
                    file_name: None,
                    content_type: "image/png".into(),
                    bytes: vec![0; 2048],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(f.avatars.saved.lock().unwrap().is_empty());
    }
}
