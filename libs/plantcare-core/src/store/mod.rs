//! In-memory data store with synchronous persistence

use crate::models::{AppSettings, Plant, Room, Zone};
use serde::{Deserialize, Serialize};

mod core;
pub mod migration;
pub mod seed;
pub mod validators;

pub use self::core::PlantStore;

/// Every persisted collection, as captured by backups and restored wholesale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreContents {
    pub rooms: Vec<Room>,
    pub zones: Vec<Zone>,
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub settings: AppSettings,
}
