//! Local plant photo directory
//!
//! Photos are stored as `<plant id>.<ext>` files. Backups carry their
//! metadata only; restoring a backup recreates the directory but not the
//! image bytes.

use crate::error::{PlantCareError, Result};
use crate::models::PhotoRecord;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};
use uuid::Uuid;

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "webp"];

fn is_photo_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PHOTO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Directory of plant photos
#[derive(Debug, Clone)]
pub struct PhotoLibrary {
    dir: PathBuf,
}

impl PhotoLibrary {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the photo directory if needed
    ///
    /// # Errors
    /// Returns `InvalidDirectory` if the path exists but is not a directory,
    /// or an IO error if it cannot be created
    pub async fn ensure_directory(&self) -> Result<()> {
        match fs::metadata(&self.dir).await {
            Ok(meta) if !meta.is_dir() => Err(PlantCareError::InvalidDirectory {
                path: self.dir.display().to_string(),
            }),
            Ok(_) => Ok(()),
            Err(_) => {
                debug!("Creating photo directory {}", self.dir.display());
                fs::create_dir_all(&self.dir).await?;
                Ok(())
            }
        }
    }

    /// Metadata of every photo, sorted by file name; empty if the directory is missing
    ///
    /// # Errors
    /// Returns an IO error if the directory exists but cannot be read
    #[instrument(skip(self))]
    pub async fn list_photos(&self) -> Result<Vec<PhotoRecord>> {
        if fs::metadata(&self.dir).await.is_err() {
            return Ok(Vec::new());
        }

        let mut photos = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_photo_file(&path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            photos.push(PhotoRecord {
                file_name: file_name.to_string(),
                plant_id: path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| Uuid::parse_str(s).ok()),
                size_bytes: meta.len(),
                modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        photos.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(photos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_directory_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let library = PhotoLibrary::new(temp_dir.path().join("photos"));
        assert!(library.list_photos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_photo_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let library = PhotoLibrary::new(temp_dir.path().join("photos"));
        let plant_id = Uuid::new_v4();

        library.ensure_directory().await.unwrap();
        std::fs::write(library.dir().join(format!("{plant_id}.jpg")), b"jpeg bytes").unwrap();
        std::fs::write(library.dir().join("notes.txt"), b"not a photo").unwrap();
        std::fs::write(library.dir().join("cover.PNG"), b"png").unwrap();

        let photos = library.list_photos().await.unwrap();
        assert_eq!(photos.len(), 2);
        let saved = photos.iter().find(|p| p.plant_id == Some(plant_id)).unwrap();
        assert_eq!(saved.size_bytes, 10);
        assert!(photos.iter().any(|p| p.file_name == "cover.PNG" && p.plant_id.is_none()));
    }

    #[tokio::test]
    async fn test_ensure_directory_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("photos");
        std::fs::write(&file, b"x").unwrap();

        let library = PhotoLibrary::new(&file);
        assert!(matches!(
            library.ensure_directory().await,
            Err(PlantCareError::InvalidDirectory { .. })
        ));
    }
}
