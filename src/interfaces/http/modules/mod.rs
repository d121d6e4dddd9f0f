pub mod activity_logs;
pub mod auth;
pub mod health;
pub mod metrics;
pub mod profile;
pub mod request_id;
pub mod users;
