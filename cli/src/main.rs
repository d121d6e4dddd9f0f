//! Regwatch admin API server
//!
//! ```sh
//! # Run with default config (~/.config/regwatch/config.toml)
//! regwatch-admin
//!
//! # Custom config path
//! regwatch-admin --config /etc/regwatch/config.toml
//!
//! # Override the port
//! regwatch-admin --port 8080
//!
//! # Validate config without starting
//! regwatch-admin --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};

use regwatch::config::AppConfig;
use regwatch::server::{init_tracing, ServerHandle, ServerOptions};

#[derive(Parser, Debug)]
#[command(
    name = "regwatch-admin",
    version,
    about = "Accounts, sessions and audit trail API for the regwatch back office",
    long_about = "Regwatch admin: REST API for account administration, cookie sessions, \
                  OTP password reset and the activity log.\n\n\
                  Default config: ~/.config/regwatch/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "REGWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the bootstrap administrator.
    #[arg(long)]
    no_admin: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(regwatch::default_config_path);
    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    if cli.check {
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Address     : {}:{}", config.server.host, config.server.port);
        println!("   Environment : {:?}", config.server.environment);
        println!("   Database    : {}", config.database.url);
        println!("   Media root  : {}", config.accounts.media_root.display());
        println!("   Log level   : {}", config.logging.level);
        return ExitCode::SUCCESS;
    }

    init_tracing(&config);
    info!("Configuration loaded from {}", config_path.display());
    if config.is_production() && config.security.jwt_secret == "change-me-in-production" {
        warn!("⚠️  Running in production with the default JWT secret");
    }

    let handle = match ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_default_admin: !cli.no_admin,
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shutdown gracefully.");
    handle.wait().await;

    ExitCode::SUCCESS
}
