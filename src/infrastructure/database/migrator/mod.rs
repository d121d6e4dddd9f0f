//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users;
mod m20250101_000002_create_password_reset_otps;
mod m20250101_000003_create_activity_logs;
mod m20250101_000004_create_blacklisted_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users::Migration),
            Box::new(m20250101_000002_create_password_reset_otps::Migration),
            Box::new(m20250101_000003_create_activity_logs::Migration),
            Box::new(m20250101_000004_create_blacklisted_tokens::Migration),
        ]
    }
}
