//! Auth module: sessions and self-service password reset

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
