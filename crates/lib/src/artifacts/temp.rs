//! Scoped temporary file for a downloaded artifact.

use std::path::{Path, PathBuf};

/// Owns a file on disk and deletes it when removed or dropped.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    removed: bool,
}

impl TempArtifact {
    /// Unique `image_<uuid>.png` path under `dir`. Nothing is created yet.
    pub(crate) fn reserve(dir: &Path) -> Self {
        let name = format!("image_{}.png", uuid::Uuid::new_v4());
        Self {
            path: dir.join(name),
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name only, used as the attachment name.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.png")
    }

    /// Delete the file now. A file that is already gone is not an error.
    pub async fn remove(mut self) -> std::io::Result<()> {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("removed artifact {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to remove artifact {}: {}", self.path.display(), e),
        }
    }
}
