//! Append-only audit trail

pub mod model;

pub use model::{ActivityAction, ActivityLog, ActivityLogFilter, NewActivityLog};
