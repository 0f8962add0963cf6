//! Process-wide application context
//!
//! [`PlantCareApp`] is built once from a [`PlantCareConfig`] and owns the
//! store, the photo library and the backup engine. Nothing here is global;
//! callers hold the context and pass it where it is needed.

use crate::backup::{BackupEngine, BackupEntry, BackupMetadata};
use crate::config::PlantCareConfig;
use crate::error::Result;
use crate::notifications::{LogNotificationScheduler, NotificationScheduler};
use crate::photos::PhotoLibrary;
use crate::scheduler::{Clock, SystemClock};
use crate::session::CareSession;
use crate::storage::FileKeyValueStore;
use crate::store::PlantStore;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Store, photos and backups of one running process
#[derive(Debug)]
pub struct PlantCareApp {
    config: PlantCareConfig,
    store: PlantStore,
    photos: PhotoLibrary,
    backups: BackupEngine,
}

impl PlantCareApp {
    /// Build the context with the system clock and log-only reminders
    ///
    /// # Errors
    /// Returns a configuration error if the config is invalid, or an error if
    /// the data directory cannot be opened
    pub async fn new(config: PlantCareConfig) -> Result<Self> {
        let reminders: Arc<dyn NotificationScheduler> = Arc::new(LogNotificationScheduler);
        Self::with_collaborators(config, Arc::new(SystemClock), Some(reminders)).await
    }

    /// Build the context with explicit collaborators
    ///
    /// An unreachable backup destination does not prevent startup. The
    /// destination is picked again on every backup operation, which fails
    /// with `StorageUnavailable` while neither directory is usable.
    ///
    /// # Errors
    /// Returns a configuration error if the config is invalid, or an error if
    /// the data directory cannot be opened
    #[instrument(skip_all, fields(data_dir = %config.data_dir.display()))]
    pub async fn with_collaborators(
        config: PlantCareConfig,
        clock: Arc<dyn Clock>,
        reminders: Option<Arc<dyn NotificationScheduler>>,
    ) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(FileKeyValueStore::open(&config.data_dir)?);
        let mut store = PlantStore::load(storage, clock);
        if let Some(reminders) = reminders {
            store = store.with_reminders(reminders);
        }

        let photos = PhotoLibrary::new(&config.photo_dir);
        let backups = BackupEngine::with_directories(
            config.cloud_backup_dir.clone(),
            &config.local_backup_dir,
            photos.clone(),
            &config.device_label,
        )
        .with_auto_backup_interval(Duration::hours(config.auto_backup_interval_hours));
        match backups.location().await {
            Ok(location) => info!(?location, "Backup destination ready"),
            Err(e) => warn!("No backup destination yet: {}", e),
        }

        Ok(Self {
            config,
            store,
            photos,
            backups,
        })
    }

    /// Prepare the photo directory and take an automatic backup if one is due
    pub async fn startup(&mut self) -> Option<BackupEntry> {
        if let Err(e) = self.photos.ensure_directory().await {
            warn!("Photo directory unavailable: {}", e);
        }
        let backup = self.backups.schedule_automatic_backup(&self.store).await;
        info!(
            plants = self.store.plants().len(),
            rooms = self.store.rooms().len(),
            zones = self.store.zones().len(),
            "Plant care started"
        );
        backup
    }

    /// End any running care session; returns it
    pub fn shutdown(&mut self) -> Option<CareSession> {
        let session = self.store.end_care_session();
        info!("Plant care stopped");
        session
    }

    #[must_use]
    pub fn config(&self) -> &PlantCareConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &PlantStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PlantStore {
        &mut self.store
    }

    #[must_use]
    pub fn photos(&self) -> &PhotoLibrary {
        &self.photos
    }

    #[must_use]
    pub fn backups(&self) -> &BackupEngine {
        &self.backups
    }

    /// Take a backup now
    ///
    /// # Errors
    /// Returns `StorageUnavailable` without a destination, or the backup error
    pub async fn backup_now(&self) -> Result<BackupEntry> {
        self.backups.perform_backup(&self.store).await
    }

    /// Readable snapshots, newest first
    ///
    /// # Errors
    /// Returns `StorageUnavailable` without a destination, or a listing error
    pub async fn list_backups(&self) -> Result<Vec<BackupEntry>> {
        self.backups.list_available_backups().await
    }

    /// Replace the store with a snapshot
    ///
    /// # Errors
    /// Returns `StorageUnavailable` without a destination, or the restore error
    pub async fn restore(&mut self, file_name: &str) -> Result<BackupMetadata> {
        self.backups
            .restore_from_backup(file_name, &mut self.store)
            .await
    }
}
