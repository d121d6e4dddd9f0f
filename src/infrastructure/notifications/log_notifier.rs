//! Development notifier that logs messages instead of sending e-mail.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::application::ports::{Notifier, PortError};
use crate::domain::User;

#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_password_reset_otp(
        &self,
        user: &User,
        code: &str,
        valid_minutes: i64,
    ) -> Result<(), PortError> {
        info!(
            to_email = %user.email,
            template = "password_reset_otp",
            valid_minutes,
            "email send stub"
        );
        debug!(to_email = %user.email, code, "password reset code");
        Ok(())
    }

    async fn send_account_created(
        &self,
        user: &User,
        initial_password: Option<&str>,
    ) -> Result<(), PortError> {
        info!(
            to_email = %user.email,
            template = "account_created",
            user_level = %user.user_level,
            default_password = initial_password.is_some(),
            "email send stub"
        );
        Ok(())
    }
}
