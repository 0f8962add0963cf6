//! Backup and restore of the whole store as snapshot files

mod snapshot;
mod storage;

pub use snapshot::{BackupMetadata, BackupSnapshot};
pub use storage::{resolve_destination, BackupLocation, BackupStorage, DirectoryBackupStorage};

use crate::error::{PlantCareError, Result};
use crate::photos::PhotoLibrary;
use crate::store::PlantStore;
use chrono::{DateTime, Duration, Local, Utc};
use plantcare_common::{backup_file_name, parse_backup_file_timestamp, AUTO_BACKUP_INTERVAL_HOURS};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Collision suffixes tried before giving up on a file name
const MAX_NAME_ATTEMPTS: u32 = 100;

/// A snapshot file found in backup storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub file_name: String,
    pub metadata: BackupMetadata,
    pub location: BackupLocation,
    pub size_bytes: u64,
}

/// Backup statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupStats {
    pub total_backups: usize,
    pub total_size: u64,
    pub oldest_backup: Option<DateTime<Utc>>,
    pub newest_backup: Option<DateTime<Utc>>,
    pub location: BackupLocation,
}

enum Destination {
    /// Always the same storage
    Fixed(Arc<dyn BackupStorage>),
    /// Cloud directory if usable, else the local one; checked on every use
    CloudOrLocal {
        cloud_dir: Option<PathBuf>,
        local_dir: PathBuf,
    },
}

/// Takes, lists, restores and prunes snapshots
pub struct BackupEngine {
    destination: Destination,
    photos: PhotoLibrary,
    device_label: String,
    auto_backup_interval: Duration,
}

impl std::fmt::Debug for BackupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("BackupEngine");
        match &self.destination {
            Destination::Fixed(storage) => debug.field("location", &storage.location()),
            Destination::CloudOrLocal {
                cloud_dir,
                local_dir,
            } => debug
                .field("cloud_dir", cloud_dir)
                .field("local_dir", local_dir),
        };
        debug
            .field("photos", &self.photos)
            .field("device_label", &self.device_label)
            .field("auto_backup_interval", &self.auto_backup_interval)
            .finish()
    }
}

impl BackupEngine {
    /// Create a backup engine writing to one fixed storage
    #[must_use]
    pub fn new(
        storage: Arc<dyn BackupStorage>,
        photos: PhotoLibrary,
        device_label: impl Into<String>,
    ) -> Self {
        Self::with_destination(Destination::Fixed(storage), photos, device_label)
    }

    /// Create a backup engine that picks the cloud directory when it is
    /// usable and the local directory otherwise, every time it touches storage
    #[must_use]
    pub fn with_directories(
        cloud_dir: Option<PathBuf>,
        local_dir: impl Into<PathBuf>,
        photos: PhotoLibrary,
        device_label: impl Into<String>,
    ) -> Self {
        let destination = Destination::CloudOrLocal {
            cloud_dir,
            local_dir: local_dir.into(),
        };
        Self::with_destination(destination, photos, device_label)
    }

    fn with_destination(
        destination: Destination,
        photos: PhotoLibrary,
        device_label: impl Into<String>,
    ) -> Self {
        Self {
            destination,
            photos,
            device_label: device_label.into(),
            auto_backup_interval: Duration::hours(AUTO_BACKUP_INTERVAL_HOURS),
        }
    }

    /// Minimum time between automatic backups
    #[must_use]
    pub fn with_auto_backup_interval(mut self, interval: Duration) -> Self {
        self.auto_backup_interval = interval;
        self
    }

    async fn storage(&self) -> Result<Arc<dyn BackupStorage>> {
        match &self.destination {
            Destination::Fixed(storage) => Ok(Arc::clone(storage)),
            Destination::CloudOrLocal {
                cloud_dir,
                local_dir,
            } => {
                let storage: Arc<dyn BackupStorage> =
                    Arc::new(resolve_destination(cloud_dir.as_deref(), local_dir).await?);
                Ok(storage)
            }
        }
    }

    /// Where snapshots would go right now
    ///
    /// # Errors
    /// Returns `StorageUnavailable` if no destination is usable
    pub async fn location(&self) -> Result<BackupLocation> {
        Ok(self.storage().await?.location())
    }

    /// Write a snapshot of the store to a new file
    ///
    /// The file is named after the current local minute; when that name is
    /// taken a ` (2)`, ` (3)`, ... suffix is added. The time of the backup is
    /// recorded in the store's key-value storage.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` if no destination is usable and
    /// `SaveFailed` if the snapshot cannot be written
    #[instrument(skip_all)]
    pub async fn perform_backup(&self, store: &PlantStore) -> Result<BackupEntry> {
        let storage = self.storage().await?;
        let created_at = store.now();
        let contents = store.snapshot_contents();
        let photos = match self.photos.list_photos().await {
            Ok(photos) => photos,
            Err(e) => {
                warn!("Backing up without photo metadata: {}", e);
                Vec::new()
            }
        };
        let snapshot = BackupSnapshot::capture(contents, photos, &self.device_label, created_at);
        let bytes = snapshot
            .to_bytes()
            .map_err(|e| PlantCareError::save_failed(format!("cannot encode snapshot: {e}")))?;

        let stamp = created_at.with_timezone(&Local).naive_local();
        let mut file_name = None;
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let candidate = backup_file_name(&stamp, attempt);
            match storage.save_new(&candidate, &bytes).await {
                Ok(()) => {
                    file_name = Some(candidate);
                    break;
                }
                Err(PlantCareError::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next suffix", candidate);
                }
                Err(e) => {
                    error!("Failed to write backup {}: {}", candidate, e);
                    return Err(PlantCareError::save_failed(e.to_string()));
                }
            }
        }
        let file_name = file_name.ok_or_else(|| {
            PlantCareError::save_failed(format!(
                "no free backup file name after {MAX_NAME_ATTEMPTS} attempts"
            ))
        })?;

        store.record_backup_date(created_at);
        let location = storage.location();
        if location.is_cloud() {
            info!("Backup {} saved to cloud storage", file_name);
        } else {
            warn!("Backup {} saved locally only", file_name);
        }
        Ok(BackupEntry {
            file_name,
            metadata: snapshot.metadata,
            location,
            size_bytes: bytes.len() as u64,
        })
    }

    /// Every readable snapshot, newest first
    ///
    /// Files that cannot be read or parsed are logged and skipped.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be enumerated
    #[instrument(skip(self))]
    pub async fn list_available_backups(&self) -> Result<Vec<BackupEntry>> {
        let storage = self.storage().await?;
        let location = storage.location();
        let mut entries = Vec::new();
        for file_name in storage.list().await? {
            let bytes = match storage.read(&file_name).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping unreadable backup {}: {}", file_name, e);
                    continue;
                }
            };
            match BackupSnapshot::read_metadata(&bytes) {
                Ok(metadata) => entries.push(BackupEntry {
                    file_name,
                    metadata,
                    location,
                    size_bytes: bytes.len() as u64,
                }),
                Err(e) => match parse_backup_file_timestamp(&file_name) {
                    Some(stamp) => warn!("Skipping corrupt backup from {}: {}", stamp, e),
                    None => warn!("Skipping corrupt backup {}: {}", file_name, e),
                },
            }
        }
        entries.sort_by(|a, b| {
            b.metadata
                .created_at
                .cmp(&a.metadata.created_at)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        debug!("Found {} backups", entries.len());
        Ok(entries)
    }

    /// Replace the store's contents with a snapshot
    ///
    /// Only the photo directory is ensured; photo bytes are not part of
    /// snapshots.
    ///
    /// # Errors
    /// Returns `OpenFailed` if the file cannot be read and `InvalidData` if
    /// it does not parse or has an unsupported schema version
    #[instrument(skip(self, store))]
    pub async fn restore_from_backup(
        &self,
        file_name: &str,
        store: &mut PlantStore,
    ) -> Result<BackupMetadata> {
        let bytes = self
            .storage()
            .await?
            .read(file_name)
            .await
            .map_err(|e| PlantCareError::open_failed(format!("{file_name}: {e}")))?;
        let snapshot = BackupSnapshot::from_bytes(&bytes)?;

        if let Err(e) = self.photos.ensure_directory().await {
            warn!("Photo directory unavailable after restore: {}", e);
        }

        let metadata = snapshot.metadata.clone();
        store.replace_all(snapshot.into_contents());
        info!(
            "Restored backup {} from {} ({} plants)",
            file_name, metadata.created_at, metadata.plant_count
        );
        Ok(metadata)
    }

    /// Delete one snapshot and return the refreshed listing
    ///
    /// # Errors
    /// Returns `OpenFailed` if the file cannot be removed, or a listing error
    #[instrument(skip(self))]
    pub async fn delete_backup(&self, file_name: &str) -> Result<Vec<BackupEntry>> {
        self.storage()
            .await?
            .delete(file_name)
            .await
            .map_err(|e| PlantCareError::open_failed(format!("{file_name}: {e}")))?;
        info!("Deleted backup {}", file_name);
        self.list_available_backups().await
    }

    /// Back up if enabled and the last backup is older than the interval
    ///
    /// Failures are logged, never returned.
    pub async fn schedule_automatic_backup(&self, store: &PlantStore) -> Option<BackupEntry> {
        if !store.settings().auto_backup_enabled {
            debug!("Automatic backups disabled");
            return None;
        }
        if let Some(last) = store.last_backup_date() {
            let elapsed = store.now() - last;
            if elapsed <= self.auto_backup_interval {
                debug!("Last backup {} is recent, skipping", last);
                return None;
            }
        }
        match self.perform_backup(store).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                error!("Automatic backup failed: {}", e);
                None
            }
        }
    }

    /// Count, total size and date range of the readable snapshots
    ///
    /// # Errors
    /// Returns an error if the storage cannot be enumerated
    pub async fn backup_stats(&self) -> Result<BackupStats> {
        let location = self.location().await?;
        let backups = self.list_available_backups().await?;
        Ok(BackupStats {
            total_backups: backups.len(),
            total_size: backups.iter().map(|b| b.size_bytes).sum(),
            oldest_backup: backups.last().map(|b| b.metadata.created_at),
            newest_backup: backups.first().map(|b| b.metadata.created_at),
            location,
        })
    }

    /// Delete all but the newest `keep` snapshots; returns how many were deleted
    ///
    /// # Errors
    /// Returns an error if the storage cannot be enumerated
    pub async fn cleanup_old_backups(&self, keep: usize) -> Result<usize> {
        let storage = self.storage().await?;
        let mut backups = self.list_available_backups().await?;
        if backups.len() <= keep {
            return Ok(0);
        }

        let mut deleted = 0;
        for backup in backups.split_off(keep) {
            match storage.delete(&backup.file_name).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!("Failed to delete backup {}: {}", backup.file_name, e),
            }
        }
        info!("Removed {} old backups", deleted);
        Ok(deleted)
    }
}
