//! Where snapshot files live

use crate::error::{PlantCareError, Result};
use async_trait::async_trait;
use plantcare_common::is_backup_file_name;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

/// Kind of destination a snapshot was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupLocation {
    /// Synced cloud directory
    #[serde(rename = "cloud")]
    Cloud,
    /// Local fallback; not synced anywhere
    #[serde(rename = "local_only")]
    LocalOnly,
}

impl BackupLocation {
    #[must_use]
    pub fn is_cloud(self) -> bool {
        self == Self::Cloud
    }
}

/// Directory-style storage of snapshot files
#[async_trait]
pub trait BackupStorage: Send + Sync {
    /// Kind of destination
    fn location(&self) -> BackupLocation;

    /// Write a new file; an existing file with that name is an
    /// `io::ErrorKind::AlreadyExists` error and is left untouched
    async fn save_new(&self, file_name: &str, bytes: &[u8]) -> Result<()>;

    /// Read a whole file
    async fn read(&self, file_name: &str) -> Result<Vec<u8>>;

    /// Names of all snapshot files
    async fn list(&self) -> Result<Vec<String>>;

    /// Remove a file
    async fn delete(&self, file_name: &str) -> Result<()>;
}

/// Snapshot files in one directory on the local file system
#[derive(Debug, Clone)]
pub struct DirectoryBackupStorage {
    dir: PathBuf,
    location: BackupLocation,
}

impl DirectoryBackupStorage {
    /// Use `dir` as is; it is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, location: BackupLocation) -> Self {
        Self {
            dir: dir.into(),
            location,
        }
    }

    /// Use `dir`, creating it now
    ///
    /// # Errors
    /// Returns `InvalidDirectory` if the path is not a usable directory
    pub async fn prepare(dir: impl Into<PathBuf>, location: BackupLocation) -> Result<Self> {
        let storage = Self::new(dir, location);
        let invalid = || PlantCareError::InvalidDirectory {
            path: storage.dir.display().to_string(),
        };
        if fs::create_dir_all(&storage.dir).await.is_err() {
            return Err(invalid());
        }
        match fs::metadata(&storage.dir).await {
            Ok(meta) if meta.is_dir() => Ok(storage),
            _ => Err(invalid()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, file_name: &str) -> Result<PathBuf> {
        let plain = Path::new(file_name)
            .file_name()
            .is_some_and(|n| n == file_name);
        if !plain || file_name.contains(['/', '\\']) {
            return Err(PlantCareError::validation(format!(
                "Invalid backup file name: {file_name:?}"
            )));
        }
        Ok(self.dir.join(file_name))
    }
}

#[async_trait]
impl BackupStorage for DirectoryBackupStorage {
    fn location(&self) -> BackupLocation {
        self.location
    }

    async fn save_new(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(file_name)?;
        // Only the create_new open below may report AlreadyExists
        if let Err(e) = fs::create_dir_all(&self.dir).await {
            warn!("Cannot create backup directory {}: {}", self.dir.display(), e);
            return Err(PlantCareError::InvalidDirectory {
                path: self.dir.display().to_string(),
            });
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn read(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(file_name)?;
        Ok(fs::read(path).await?)
    }

    async fn list(&self) -> Result<Vec<String>> {
        if fs::metadata(&self.dir).await.is_err() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if is_backup_file_name(name) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    async fn delete(&self, file_name: &str) -> Result<()> {
        let path = self.path_for(file_name)?;
        fs::remove_file(path).await?;
        Ok(())
    }
}

/// Pick the backup destination
///
/// The cloud directory wins when it is set and usable; otherwise the local
/// directory is used and reported as [`BackupLocation::LocalOnly`].
///
/// # Errors
/// Returns `StorageUnavailable` if neither directory is usable
pub async fn resolve_destination(
    cloud_dir: Option<&Path>,
    local_dir: &Path,
) -> Result<DirectoryBackupStorage> {
    if let Some(cloud_dir) = cloud_dir {
        match DirectoryBackupStorage::prepare(cloud_dir, BackupLocation::Cloud).await {
            Ok(storage) => return Ok(storage),
            Err(e) => warn!("Cloud backup directory unavailable, using local storage: {}", e),
        }
    }
    DirectoryBackupStorage::prepare(local_dir, BackupLocation::LocalOnly)
        .await
        .map_err(|e| {
            error!("Local backup directory unavailable: {}", e);
            PlantCareError::StorageUnavailable
        })
}
