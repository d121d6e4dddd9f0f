//! Reusable server runtime.
//!
//! [`ServerHandle`] owns the whole lifecycle: database init, migrations,
//! bootstrap administrator, REST API, the blacklist purge task and graceful
//! shutdown. The smaller builders ([`build_gateway`], [`build_router`],
//! [`ensure_admin`]) are public so tests can assemble the same application
//! against an in-memory database.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::identity::{
    start_blacklist_purge_task, AccountPolicy, CredentialStore, ResetPolicy,
};
use crate::application::{AuthGateway, IdentityConfig, Notifier};
use crate::config::{AdminConfig, AppConfig};
use crate::domain::user::CreateUserDto;
use crate::domain::{DomainResult, User, UserLevel, UserStatus};
use crate::infrastructure::crypto::TokenConfig;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::database::repositories::UserRepository;
use crate::infrastructure::{init_database, DatabaseConfig, LocalAvatarStorage, LogNotifier};
use crate::interfaces::http::common::CookieConfig;
use crate::interfaces::http::{create_api_router, AppState, RouterOptions};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Create the configured administrator when no account exists (default: true).
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

// ── Builders ───────────────────────────────────────────────────────

pub fn identity_config(config: &AppConfig) -> IdentityConfig {
    IdentityConfig {
        tokens: TokenConfig {
            secret: config.security.jwt_secret.clone(),
            issuer: config.security.jwt_issuer.clone(),
            access_lifetime: chrono::Duration::hours(config.security.access_token_hours),
            refresh_lifetime: chrono::Duration::days(config.security.refresh_token_days),
            leeway_secs: config.security.leeway_secs,
        },
        account: AccountPolicy {
            default_password: config.accounts.default_password.clone(),
            default_avatar: config.accounts.default_avatar.clone(),
        },
        reset: ResetPolicy {
            otp_lifetime: chrono::Duration::minutes(config.password_reset.otp_lifetime_minutes),
        },
        bcrypt_cost: config.security.bcrypt_cost,
        max_avatar_bytes: config.accounts.max_avatar_bytes,
    }
}

pub fn build_gateway(
    config: &AppConfig,
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
) -> AuthGateway {
    let avatars = Arc::new(LocalAvatarStorage::new(
        config.accounts.media_root.clone(),
        config.accounts.default_avatar.clone(),
    ));
    AuthGateway::new(db, identity_config(config), notifier, avatars)
}

pub fn build_router(
    config: &AppConfig,
    gateway: AuthGateway,
    db: DatabaseConnection,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let state = AppState::new(gateway, CookieConfig::from_app_config(config), db);
    create_api_router(
        state,
        RouterOptions {
            metrics,
            cors_origins: config.server.cors_origins.clone(),
            media_root: config.accounts.media_root.clone(),
            max_avatar_bytes: config.accounts.max_avatar_bytes,
        },
    )
}

/// Create the configured administrator if the database holds no account.
/// Returns the new account, or `None` when accounts already exist.
pub async fn ensure_admin(
    db: &DatabaseConnection,
    credentials: &CredentialStore,
    admin: &AdminConfig,
) -> DomainResult<Option<User>> {
    if UserRepository::new(db).count().await? > 0 {
        return Ok(None);
    }

    let user = credentials
        .create(
            db,
            CreateUserDto {
                email: admin.email.clone(),
                first_name: admin.first_name.clone(),
                last_name: admin.last_name.clone(),
                middle_name: String::new(),
                user_level: UserLevel::Administrator,
                status: UserStatus::Active,
                password: Some(admin.password.clone()),
            },
        )
        .await?;
    Ok(Some(user))
}

/// The global recorder can only be installed once per process; later
/// starts in the same process reuse the first handle.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    if let Some(handle) = HANDLE.get() {
        return Some(handle.clone());
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("📊 Prometheus metrics recorder installed");
            Some(HANDLE.get_or_init(|| handle).clone())
        }
        Err(e) => {
            warn!(error = %e, "metrics recorder unavailable, /metrics disabled");
            None
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running server.
///
/// ```rust,no_run
/// use regwatch::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub config: AppConfig,
    /// Address the API is bound to.
    pub local_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
    purge_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// 1. Install the Prometheus recorder
    /// 2. Connect to the database and run migrations
    /// 3. Create the bootstrap administrator (if enabled)
    /// 4. Start the blacklist purge task
    /// 5. Start the REST API
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting regwatch admin API...");
        let metrics = prometheus_handle();

        // ── Database ───────────────────────────────────────────
        let db = init_database(&DatabaseConfig {
            url: app_cfg.database.url.clone(),
            max_connections: app_cfg.database.max_connections,
        })
        .await?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        tokio::fs::create_dir_all(&app_cfg.accounts.media_root).await?;

        // ── Identity ───────────────────────────────────────────
        let gateway = build_gateway(&app_cfg, db.clone(), Arc::new(LogNotifier));

        if opts.create_default_admin {
            match ensure_admin(&db, gateway.credentials(), &app_cfg.admin).await {
                Ok(Some(admin)) => {
                    info!(email = %admin.email, "Default administrator created");
                    warn!("⚠️  Please change the administrator password immediately!");
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "Failed to create default administrator"),
            }
        }

        // ── Shutdown coordinator & background tasks ────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let signal = shutdown.signal();

        let purge_task = start_blacklist_purge_task(
            gateway.tokens().clone(),
            signal.clone(),
            app_cfg.server.cleanup_interval_secs,
        );

        // ── REST API ───────────────────────────────────────────
        let router = build_router(&app_cfg, gateway, db.clone(), metrics);

        let addr = format!("{}:{}", app_cfg.server.host, app_cfg.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = signal.clone();
        let api_server = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Server started");

        Ok(Self {
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
            purge_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait until the API has stopped, then close the database.
    ///
    /// In-flight requests get `server.shutdown_timeout` seconds once
    /// shutdown was triggered.
    pub async fn wait(self) {
        let grace = Duration::from_secs(self.shutdown.timeout_secs());
        let signal = self.shutdown.signal();
        let mut api_task = self.api_task;

        tokio::select! {
            result = &mut api_task => {
                if let Err(e) = result {
                    error!("REST API task panicked: {}", e);
                }
            }
            _ = signal.wait() => {
                info!("⏳ Waiting for in-flight requests...");
                match tokio::time::timeout(grace, &mut api_task).await {
                    Ok(Ok(())) => info!("REST API stopped"),
                    Ok(Err(e)) => error!("REST API task panicked: {}", e),
                    Err(_) => {
                        warn!(timeout_secs = grace.as_secs(), "graceful shutdown timed out");
                        api_task.abort();
                    }
                }
            }
        }

        self.purge_task.abort();

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("✅ Database connection closed");
        }
        info!("👋 Shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialize tracing from the application config. `RUST_LOG` wins over
/// `logging.level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::test_support::memory_db;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.security.bcrypt_cost = 4;
        config.security.jwt_secret = "test-secret-test-secret".into();
        config
    }

    #[tokio::test]
    async fn ensure_admin_only_bootstraps_an_empty_database() {
        let config = test_config();
        let db = memory_db().await;
        let gateway = build_gateway(&config, db.clone(), Arc::new(LogNotifier));

        let admin = ensure_admin(&db, gateway.credentials(), &config.admin)
            .await
            .unwrap()
            .expect("admin created");
        assert!(admin.is_administrator());
        assert!(admin.is_active());
        assert!(!admin.using_default_password);

        let again = ensure_admin(&db, gateway.credentials(), &config.admin)
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn identity_config_follows_app_config() {
        let mut config = test_config();
        config.security.access_token_hours = 2;
        config.password_reset.otp_lifetime_minutes = 5;
        let identity = identity_config(&config);
        assert_eq!(identity.tokens.access_lifetime, chrono::Duration::hours(2));
        assert_eq!(identity.reset.otp_lifetime, chrono::Duration::minutes(5));
        assert_eq!(identity.bcrypt_cost, 4);
    }
}
