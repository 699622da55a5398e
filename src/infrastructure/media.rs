//! Uploaded files under the media root.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::domain::MEDIA_URL;

/// Largest accepted student photo.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

const PHOTO_DIR: &str = "student_photos";

#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a photo under a fresh name and return its media-relative path.
    ///
    /// The extension comes from the image bytes when recognisable, otherwise
    /// from the uploaded file name.
    pub async fn save_photo(&self, bytes: &[u8], file_name: Option<&str>) -> io::Result<String> {
        let ext = photo_extension(bytes, file_name);
        let relative = format!("{}/{}.{}", PHOTO_DIR, Uuid::new_v4(), ext);

        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored photo");
        Ok(relative)
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, relative: &str) -> io::Result<()> {
        let Some(path) = self.resolve(relative) else {
            tracing::warn!(path = relative, "Refusing to remove path outside media root");
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Public URL of a stored file.
    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", MEDIA_URL, relative)
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }
}

fn photo_extension(bytes: &[u8], file_name: Option<&str>) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        if let Some(ext) = format.extensions_str().first() {
            return ext.to_string();
        }
    }

    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "bin".to_string())
}
