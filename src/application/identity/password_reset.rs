//! OTP reset broker: password reset by one-time e-mailed code.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, warn};

use super::audit::AuditLogger;
use super::context::ClientContext;
use super::credentials::CredentialStore;
use crate::application::ports::Notifier;
use crate::domain::user::normalize_email;
use crate::domain::{ActivityAction, DomainError, DomainResult, NewActivityLog};
use crate::infrastructure::crypto::otp::generate_otp;
use crate::infrastructure::database::repositories::{OtpRepository, UserRepository};

/// Returned for every reset request, whether or not the account exists.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If this email exists in our system, you will receive a password reset OTP";
pub const OTP_DELIVERY_FAILED_MESSAGE: &str = "Failed to send OTP. Please try again later.";

#[derive(Debug, Clone)]
pub struct ResetPolicy {
    pub otp_lifetime: Duration,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self {
            otp_lifetime: Duration::minutes(15),
        }
    }
}

#[derive(Clone)]
pub struct OtpResetBroker {
    db: DatabaseConnection,
    credentials: CredentialStore,
    audit: AuditLogger,
    notifier: Arc<dyn Notifier>,
    policy: ResetPolicy,
}

impl OtpResetBroker {
    pub fn new(
        db: DatabaseConnection,
        credentials: CredentialStore,
        audit: AuditLogger,
        notifier: Arc<dyn Notifier>,
        policy: ResetPolicy,
    ) -> Self {
        Self {
            db,
            credentials,
            audit,
            notifier,
            policy,
        }
    }

    /// Issue a fresh code for the account, invalidating earlier ones, and
    /// hand it to the notifier. Unknown emails succeed without side effects.
    /// A delivery failure is reported after the code has been stored.
    pub async fn request_reset(&self, email: &str, ctx: &ClientContext) -> DomainResult<()> {
        let email = normalize_email(email);

        let txn = self.db.begin().await?;
        let Some(user) = UserRepository::new(&txn).find_by_email_for_update(&email).await? else {
            txn.rollback().await?;
            info!("password reset requested for unknown email");
            return Ok(());
        };

        let otps = OtpRepository::new(&txn);
        let invalidated = otps.invalidate_unused(user.id).await?;
        let now = Utc::now();
        let code = generate_otp();
        otps.insert(user.id, &code, now, now + self.policy.otp_lifetime)
            .await?;
        txn.commit().await?;

        info!(user_id = user.id, invalidated, "password reset code issued");

        let minutes = self.policy.otp_lifetime.num_minutes();
        if let Err(e) = self
            .notifier
            .send_password_reset_otp(&user, &code, minutes)
            .await
        {
            warn!(user_id = user.id, error = %e, "password reset code delivery failed");
            return Err(DomainError::DeliveryFailed(
                OTP_DELIVERY_FAILED_MESSAGE.to_string(),
            ));
        }

        self.audit
            .record(
                &self.db,
                NewActivityLog::new(ActivityAction::OtpSent)
                    .user(user.id)
                    .detail("email", user.email.clone())
                    .detail("ip_address", ctx.ip_or_unknown()),
            )
            .await?;
        Ok(())
    }

    /// Consume a valid code and set the new password in one transaction.
    /// Unknown accounts and bad codes fail identically.
    pub async fn verify_and_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
        ctx: &ClientContext,
    ) -> DomainResult<()> {
        let hash = self
            .credentials
            .prepare_password(new_password, "new_password")
            .await?;

        let txn = self.db.begin().await?;
        let users = UserRepository::new(&txn);
        let Some(user) = users.find_by_email_for_update(email).await? else {
            return Err(DomainError::InvalidOrExpiredOtp);
        };

        let otps = OtpRepository::new(&txn);
        let Some(otp) = otps.find_valid(user.id, code.trim(), Utc::now()).await? else {
            return Err(DomainError::InvalidOrExpiredOtp);
        };
        if !otps.mark_used(otp.id).await? {
            return Err(DomainError::InvalidOrExpiredOtp);
        }

        let user = self
            .credentials
            .store_password(&txn, user, hash, false)
            .await?;
        self.audit
            .record(
                &txn,
                NewActivityLog::new(ActivityAction::PasswordResetSuccess)
                    .user(user.id)
                    .detail("email", user.email.clone())
                    .detail("reset_method", "otp")
                    .detail("ip_address", ctx.ip_or_unknown()),
            )
            .await?;
        txn.commit().await?;

        info!(user_id = user.id, "password reset via OTP");
        Ok(())
    }
}
