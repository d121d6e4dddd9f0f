//! # Regwatch admin
//!
//! Account, session and audit backend for the administrative side of a
//! regulatory-monitoring office.
//!
//! ## Architecture
//!
//! - **domain**: accounts, roles, audit records, reset codes
//! - **application**: the auth gateway and the components behind it
//!   (credential store, token issuer, reset broker, audit logger) and the
//!   outbound ports they use
//! - **infrastructure**: SeaORM persistence, crypto, media storage, notifier
//! - **interfaces**: axum HTTP API with Swagger documentation
//! - **server**: process bootstrap and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, DatabaseConfig};

pub use interfaces::http::{create_api_router, RouterOptions};
