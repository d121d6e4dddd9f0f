//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod media;
pub mod notifications;

pub use database::{init_database, DatabaseConfig};
pub use media::LocalAvatarStorage;
pub use notifications::LogNotifier;
