//! Activity logs module: read side of the audit trail

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
