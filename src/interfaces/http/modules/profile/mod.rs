//! Profile module: self-service account changes

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
