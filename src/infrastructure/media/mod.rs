//! Media file storage

mod local;

pub use local::LocalAvatarStorage;
