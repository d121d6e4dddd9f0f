//! Identity module: accounts, sessions and the audit trail
//!
//! [`AuthGateway`] is the single entry point used by the HTTP layer. It
//! composes the credential store, the session token issuer, the OTP reset
//! broker and the audit logger.

pub mod audit;
pub mod context;
pub mod credentials;
pub mod gateway;
pub mod maintenance;
pub mod password_reset;
pub mod tokens;

pub use audit::{ActivityLogEntry, AuditLogger, UserSummary};
pub use context::ClientContext;
pub use credentials::{AccountPolicy, CredentialStore};
pub use gateway::{AuthGateway, AvatarUpload, IdentityConfig, LoginOutcome, RegisterOutcome};
pub use maintenance::start_blacklist_purge_task;
pub use password_reset::{OtpResetBroker, ResetPolicy, RESET_REQUESTED_MESSAGE};
pub use tokens::{SessionTokenIssuer, TokenError, TokenPair};
