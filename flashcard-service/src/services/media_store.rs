//! Transient on-disk staging for uploaded media.

use service_core::error::AppError;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Writes uploads into a scratch directory while they are handed to the
/// provider.
#[derive(Debug, Clone)]
pub struct MediaStore {
    base_path: PathBuf,
}

impl MediaStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write `data` to a temporary file named after `filename`.
    ///
    /// The returned guard owns the file; it is removed by
    /// [`StagedMedia::release`] or, failing that, when the guard drops.
    pub async fn store(&self, data: &[u8], filename: &str) -> Result<StagedMedia, AppError> {
        let path = self
            .base_path
            .join(format!("temp_{}_{}", Uuid::new_v4(), sanitize_filename(filename)));

        // Guard first so a partial write is cleaned up too
        let staged = StagedMedia {
            path,
            released: false,
        };
        fs::write(&staged.path, data).await?;

        tracing::debug!(path = %staged.path.display(), size = data.len(), "Staged media");
        Ok(staged)
    }
}

/// A staged upload on disk.
#[derive(Debug)]
pub struct StagedMedia {
    path: PathBuf,
    released: bool,
}

impl StagedMedia {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file. A file that is already gone counts as released.
    pub async fn release(mut self) -> Result<(), AppError> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Released staged media");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StagedMedia {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Failed to remove staged media"
                    );
                }
            }
        }
    }
}

/// Keep the final path component and replace anything outside
/// `[A-Za-z0-9._-]`.
fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}
