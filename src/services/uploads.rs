//! Cover image storage on the local filesystem.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

const DEFAULT_EXTENSION: &str = ".jpg";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Cover image exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("Unsupported image type '{0}'")]
    UnsupportedType(String),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes uploads under `<root>/<YYYY>/<MM>/` and hands back paths relative to
/// `root`, which is served at `/uploads`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores one uploaded file. An empty body means no file was chosen and
    /// yields `Ok(None)`.
    ///
    /// The declared content type is trusted when present; otherwise it is
    /// guessed from the client filename.
    pub async fn save(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Option<String>, UploadError> {
        if bytes.is_empty() {
            return Ok(None);
        }

        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max: self.max_bytes,
            });
        }

        let mime = content_type
            .map(str::to_ascii_lowercase)
            .or_else(|| {
                file_name
                    .and_then(|name| mime_guess::from_path(name).first())
                    .map(|m| m.essence_str().to_string())
            })
            .unwrap_or_default();

        if !ALLOWED_TYPES.contains(&mime.as_str()) {
            return Err(UploadError::UnsupportedType(mime));
        }

        let now = Utc::now();
        let dir = now.format("%Y/%m").to_string();
        let name = format!(
            "{}{}",
            now.timestamp_nanos_opt().unwrap_or_default(),
            extension_of(file_name)
        );
        let relative = format!("{dir}/{name}");

        let target_dir = self.root.join(&dir);
        fs::create_dir_all(&target_dir).await?;
        let target = target_dir.join(&name);
        fs::write(&target, bytes).await?;

        info!(path = %target.display(), size = bytes.len(), "Stored cover upload");
        Ok(Some(relative))
    }

    /// Deletes a stored upload by its relative path. A file that is already
    /// gone is not an error.
    pub async fn remove(&self, relative: &str) {
        let target = self.root.join(relative);
        match fs::remove_file(&target).await {
            Ok(()) => info!(path = %target.display(), "Removed cover upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %target.display(), error = %e, "Failed to remove cover upload"),
        }
    }
}

/// Lowercased extension with its dot, restricted to ASCII alphanumerics.
fn extension_of(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(
            || DEFAULT_EXTENSION.to_string(),
            |ext| format!(".{}", ext.to_ascii_lowercase()),
        )
}
