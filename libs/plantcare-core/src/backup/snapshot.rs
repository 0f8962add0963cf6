//! Snapshot file format

use crate::error::{PlantCareError, Result};
use crate::models::{AppSettings, PhotoRecord, Plant, Room, Zone};
use crate::store::migration::{decode_legacy, PlantDecode};
use crate::store::StoreContents;
use chrono::{DateTime, Utc};
use plantcare_common::{PLANT_SCHEMA_VERSION, SNAPSHOT_SCHEMA_VERSION, SUPPORTED_SNAPSHOT_VERSIONS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    /// Device the snapshot was taken on
    pub device_label: String,
    pub plant_count: usize,
    pub room_count: usize,
    pub zone_count: usize,
    #[serde(default)]
    pub photo_count: usize,
    /// Version of the library that wrote the snapshot
    #[serde(default)]
    pub app_version: Option<String>,
}

impl BackupMetadata {
    /// Whether this library can restore the snapshot
    #[must_use]
    pub fn is_supported(&self) -> bool {
        SUPPORTED_SNAPSHOT_VERSIONS.contains(&self.schema_version.as_str())
    }

    fn ensure_supported(&self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(PlantCareError::invalid_data(format!(
                "unsupported snapshot schema version {}",
                self.schema_version
            )))
        }
    }
}

/// Full point-in-time copy of the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub metadata: BackupMetadata,
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub photos: Vec<PhotoRecord>,
    #[serde(default)]
    pub settings: AppSettings,
}

/// Snapshot as read from disk, before plants are decoded
#[derive(Deserialize)]
struct RawSnapshot {
    metadata: BackupMetadata,
    rooms: Vec<Room>,
    #[serde(default)]
    zones: Vec<Zone>,
    plants: Value,
    #[serde(default)]
    photos: Vec<PhotoRecord>,
    #[serde(default)]
    settings: AppSettings,
}

#[derive(Deserialize)]
struct MetadataOnly {
    metadata: BackupMetadata,
}

impl BackupSnapshot {
    /// Capture store contents and photo metadata
    #[must_use]
    pub fn capture(
        contents: StoreContents,
        photos: Vec<PhotoRecord>,
        device_label: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let metadata = BackupMetadata {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            created_at,
            device_label: device_label.into(),
            plant_count: contents.plants.len(),
            room_count: contents.rooms.len(),
            zone_count: contents.zones.len(),
            photo_count: photos.len(),
            app_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        };
        Self {
            metadata,
            rooms: contents.rooms,
            zones: contents.zones,
            plants: contents.plants,
            photos,
            settings: contents.settings,
        }
    }

    /// Encode as pretty-printed JSON
    ///
    /// # Errors
    /// Returns a serialization error if encoding fails
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode a snapshot file
    ///
    /// Plants of snapshots older than the current schema go through the same
    /// compatibility shim as persisted plants.
    ///
    /// # Errors
    /// Returns `InvalidData` if the bytes do not parse or the schema version
    /// is not supported
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_slice(bytes)
            .map_err(|e| PlantCareError::invalid_data(format!("snapshot does not parse: {e}")))?;
        raw.metadata.ensure_supported()?;

        let plants = if raw.metadata.schema_version == SNAPSHOT_SCHEMA_VERSION {
            serde_json::from_value(raw.plants).map_err(|e| {
                PlantCareError::invalid_data(format!("snapshot plants do not parse: {e}"))
            })?
        } else {
            match decode_legacy(raw.plants, PLANT_SCHEMA_VERSION.checked_sub(1)) {
                PlantDecode::Current(plants) | PlantDecode::Migrated { plants, .. } => plants,
                PlantDecode::Unreadable(e) => {
                    return Err(PlantCareError::invalid_data(format!(
                        "snapshot plants do not parse: {e}"
                    )))
                }
            }
        };

        Ok(Self {
            metadata: raw.metadata,
            rooms: raw.rooms,
            zones: raw.zones,
            plants,
            photos: raw.photos,
            settings: raw.settings,
        })
    }

    /// Read only the header of a snapshot file
    ///
    /// # Errors
    /// Returns `InvalidData` if the header does not parse or the schema
    /// version is not supported
    pub fn read_metadata(bytes: &[u8]) -> Result<BackupMetadata> {
        let header: MetadataOnly = serde_json::from_slice(bytes)
            .map_err(|e| PlantCareError::invalid_data(format!("snapshot does not parse: {e}")))?;
        header.metadata.ensure_supported()?;
        Ok(header.metadata)
    }

    /// Collections to hand to the store
    #[must_use]
    pub fn into_contents(self) -> StoreContents {
        StoreContents {
            rooms: self.rooms,
            zones: self.zones,
            plants: self.plants,
            settings: self.settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_mock_contents;
    use serde_json::json;

    #[test]
    fn test_capture_counts() {
        let contents = create_mock_contents();
        let snapshot = BackupSnapshot::capture(contents, Vec::new(), "Kitchen tablet", Utc::now());

        assert_eq!(snapshot.metadata.schema_version, SNAPSHOT_SCHEMA_VERSION);
        assert_eq!(snapshot.metadata.room_count, 2);
        assert_eq!(snapshot.metadata.zone_count, 1);
        assert_eq!(snapshot.metadata.plant_count, 2);
        assert_eq!(snapshot.metadata.photo_count, 0);
        assert!(snapshot.metadata.is_supported());
    }

    #[test]
    fn test_bytes_roundtrip_preserves_contents() {
        let contents = create_mock_contents();
        let snapshot =
            BackupSnapshot::capture(contents.clone(), Vec::new(), "Laptop", Utc::now());

        let restored = BackupSnapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(restored.into_contents(), contents);
    }

    #[test]
    fn test_unsupported_version_is_invalid_data() {
        let contents = create_mock_contents();
        let mut snapshot = BackupSnapshot::capture(contents, Vec::new(), "Laptop", Utc::now());
        snapshot.metadata.schema_version = "9.0".to_string();
        let bytes = snapshot.to_bytes().unwrap();

        assert!(matches!(
            BackupSnapshot::from_bytes(&bytes),
            Err(PlantCareError::InvalidData { .. })
        ));
        assert!(matches!(
            BackupSnapshot::read_metadata(&bytes),
            Err(PlantCareError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_garbage_is_invalid_data() {
        assert!(matches!(
            BackupSnapshot::from_bytes(b"{ truncated"),
            Err(PlantCareError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_version_one_snapshot_is_migrated() {
        let bytes = serde_json::to_vec(&json!({
            "metadata": {
                "schema_version": "1.0",
                "created_at": "2023-06-01T10:00:00Z",
                "device_label": "Old phone",
                "plant_count": 1,
                "room_count": 0,
                "zone_count": 0
            },
            "rooms": [],
            "plants": [{"name": "Peace Lily", "lightType": "low"}]
        }))
        .unwrap();

        let snapshot = BackupSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(snapshot.plants.len(), 1);
        assert_eq!(snapshot.plants[0].care_steps.len(), 1);
        assert!(snapshot.zones.is_empty());
        assert_eq!(snapshot.settings, AppSettings::default());
    }
}
