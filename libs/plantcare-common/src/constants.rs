//! Constants shared by the plantcare crates

/// File extension of backup snapshots (without the dot)
pub const BACKUP_FILE_EXTENSION: &str = "plantbackup";

/// Prefix of every backup snapshot file name
pub const BACKUP_FILE_PREFIX: &str = "PlantCare Backup";

/// Timestamp layout used in backup file names (minute granularity)
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H-%M";

/// Schema version written into snapshot metadata
pub const SNAPSHOT_SCHEMA_VERSION: &str = "2.0";

/// Snapshot schema versions that can still be restored
pub const SUPPORTED_SNAPSHOT_VERSIONS: &[&str] = &["1.0", "2.0"];

/// Schema version of the persisted plant collection
pub const PLANT_SCHEMA_VERSION: u32 = 2;

/// Key-value storage keys for the persisted collections
pub const ROOMS_KEY: &str = "rooms";
pub const ZONES_KEY: &str = "zones";
pub const PLANTS_KEY: &str = "plants";
pub const SETTINGS_KEY: &str = "settings";

/// Key under which the last successful backup time is recorded
pub const LAST_BACKUP_KEY: &str = "last_backup_date";

/// Frequency of the watering step synthesized for migrated plants
pub const DEFAULT_WATERING_FREQUENCY_DAYS: i32 = 7;

/// Instructions of the watering step synthesized for migrated plants
pub const DEFAULT_WATERING_INSTRUCTIONS: &str =
    "Water thoroughly when the top few centimetres of soil feel dry.";

/// Hours between automatic backups
pub const AUTO_BACKUP_INTERVAL_HOURS: i64 = 24;

/// Hour of day at which the daily care reminder fires by default
pub const DEFAULT_REMINDER_HOUR: u8 = 9;

/// Name of the local photo directory inside the data directory
pub const PHOTO_DIR_NAME: &str = "photos";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_file_extension() {
        assert_eq!(BACKUP_FILE_EXTENSION, "plantbackup");
        assert!(!BACKUP_FILE_EXTENSION.starts_with('.'));
    }

    #[test]
    fn test_current_snapshot_version_is_supported() {
        assert!(SUPPORTED_SNAPSHOT_VERSIONS.contains(&SNAPSHOT_SCHEMA_VERSION));
    }

    #[test]
    fn test_storage_keys_are_distinct() {
        let keys = [ROOMS_KEY, ZONES_KEY, PLANTS_KEY, SETTINGS_KEY, LAST_BACKUP_KEY];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_default_watering_frequency() {
        assert_eq!(DEFAULT_WATERING_FREQUENCY_DAYS, 7);
        assert!(!DEFAULT_WATERING_INSTRUCTIONS.is_empty());
    }
}
