//! Plantcare Core - Care schedules, care sessions, persistence and backups
//!
//! This library tracks the plants in a home: rooms with windows, outdoor
//! zones, the plants placed in them and the recurring care each plant needs.
//!
//! # Features
//!
//! - **Care Scheduling**: Calendar-day due dates for every care step
//! - **Care Sessions**: Walkthroughs that remember what was done in this round
//! - **Persistence**: Whole-collection writes to a key-value storage, with
//!   seed data and migration of older plant records
//! - **Backups**: Snapshot files in a cloud or local directory, listed,
//!   restored and taken automatically
//! - **Advisor Contract**: Request construction and defensive parsing for a
//!   chat-completion plant advisor
//!
//! # Quick Start
//!
//! ```no_run
//! use plantcare_core::{load_config, PlantCareApp, PlantCareError};
//!
//! # async fn example() -> Result<(), PlantCareError> {
//! let config = load_config()?;
//! let mut app = PlantCareApp::new(config).await?;
//! app.startup().await;
//!
//! let summary = app.store().care_summary();
//! println!("{} care steps overdue", summary.overdue);
//!
//! app.store_mut().start_care_session();
//! let pending: Vec<_> = app
//!     .store()
//!     .all_overdue_care_steps()
//!     .into_iter()
//!     .map(|(plant, step)| (plant.id, step.id))
//!     .collect();
//! for (plant_id, step_id) in pending {
//!     app.store_mut().mark_care_step_completed(plant_id, step_id)?;
//! }
//! app.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Features
//!
//! - `test-utils`: Enable test utilities (for testing only)

pub mod advisor;
pub mod app;
pub mod backup;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod models;
pub mod notifications;
pub mod observability;
pub mod photos;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use advisor::{
    AdvisorAnswer, ChatAdvisor, ChatTransport, PlantAdvisor, PlantCareDescriptor, PlantNameGuess,
    SuggestedChanges,
};
pub use app::PlantCareApp;
pub use backup::{
    BackupEngine, BackupEntry, BackupLocation, BackupMetadata, BackupSnapshot, BackupStats,
    BackupStorage, DirectoryBackupStorage,
};
pub use config::{ConfigOverrides, PlantCareConfig};
pub use config_loader::{load_config, load_config_from_env, load_config_with_paths, ConfigLoader};
pub use error::{PlantCareError, Result};
pub use events::{EventBroadcaster, StoreEvent, StoreEventType};
pub use models::{
    AppSettings, CareStep, CareStepType, CompassDirection, HumidityLevel, LightType, PhotoRecord,
    Plant, PlantLocation, Room, SunPeriod, WindExposure, Window, Zone,
};
pub use notifications::{LogNotificationScheduler, NotificationScheduler};
pub use observability::{init_tracing, LoggingConfig};
pub use photos::PhotoLibrary;
pub use scheduler::{CareStatus, CareSummary, Clock, SystemClock};
pub use session::{CareSession, WalkthroughLocation, WalkthroughStop};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::{PlantStore, StoreContents};
