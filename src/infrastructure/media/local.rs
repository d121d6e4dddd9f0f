//! Avatar files on the local filesystem under the media root.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::application::ports::{AvatarStorage, PortError};

const AVATAR_DIR: &str = "avatars";

#[derive(Clone, Debug)]
pub struct LocalAvatarStorage {
    root: PathBuf,
    default_avatar: String,
}

impl LocalAvatarStorage {
    pub fn new(root: impl Into<PathBuf>, default_avatar: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_avatar: default_avatar.into(),
        }
    }

    /// Resolve a stored name below the root, refusing anything that could
    /// escape it.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        if relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            Some(self.root.join(relative))
        } else {
            None
        }
    }
}

#[async_trait]
impl AvatarStorage for LocalAvatarStorage {
    async fn save(&self, user_id: i32, extension: &str, bytes: &[u8]) -> Result<String, PortError> {
        let dir = self.root.join(AVATAR_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!(
            "{AVATAR_DIR}/{user_id}_{}.{extension}",
            Utc::now().timestamp_millis()
        );
        tokio::fs::write(self.root.join(&name), bytes).await?;
        debug!(user_id, file = %name, size = bytes.len(), "avatar stored");
        Ok(name)
    }

    async fn delete(&self, name: &str) -> Result<(), PortError> {
        // The shared default picture is never removed.
        if name.is_empty() || name == self.default_avatar {
            return Ok(());
        }
        let Some(path) = self.resolve(name) else {
            warn!(file = %name, "refusing to delete avatar outside media root");
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
