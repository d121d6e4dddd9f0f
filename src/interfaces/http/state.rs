use std::sync::Arc;
use std::time::Instant;

use sea_orm::DatabaseConnection;

use super::common::CookieConfig;
use crate::application::AuthGateway;

/// Shared state of every API route.
#[derive(Clone)]
pub struct AppState {
    pub gateway: AuthGateway,
    pub cookies: CookieConfig,
    pub db: DatabaseConnection,
    pub started_at: Arc<Instant>,
}

impl AppState {
    pub fn new(gateway: AuthGateway, cookies: CookieConfig, db: DatabaseConnection) -> Self {
        Self {
            gateway,
            cookies,
            db,
            started_at: Arc::new(Instant::now()),
        }
    }
}
