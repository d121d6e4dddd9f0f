//! Application ports (hexagonal architecture boundaries)
//!
//! Outbound ports that the identity services call; implementations live in
//! `infrastructure`.

pub mod outbound;

pub use outbound::{AvatarStorage, Notifier, PortError};
