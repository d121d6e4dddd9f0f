pub mod identity;
pub mod ports;

pub use identity::{AuthGateway, ClientContext, IdentityConfig};
pub use ports::{AvatarStorage, Notifier, PortError};
