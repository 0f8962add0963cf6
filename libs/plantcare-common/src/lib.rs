//! Plantcare Common - Shared constants and utilities for the plantcare crates
//!
//! # Examples
//!
//! ```
//! use plantcare_common::{BACKUP_FILE_EXTENSION, is_backup_file_name, truncate_string};
//!
//! assert_eq!(BACKUP_FILE_EXTENSION, "plantbackup");
//! assert!(is_backup_file_name("PlantCare Backup 2024-05-17 14-03.plantbackup"));
//! assert_eq!(truncate_string("hello world", 5), "he...");
//! ```

pub mod constants;
pub mod utils;

pub use constants::*;
pub use utils::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_re_exported_constants() {
        assert_eq!(BACKUP_FILE_EXTENSION, "plantbackup");
        assert_eq!(PLANTS_KEY, "plants");
        assert_eq!(DEFAULT_WATERING_FREQUENCY_DAYS, 7);
        assert_eq!(AUTO_BACKUP_INTERVAL_HOURS, 24);
    }

    #[test]
    fn test_re_exported_functions() {
        assert!(is_backup_file_name("a.plantbackup"));
        assert_eq!(truncate_string("hi", 10), "hi");
        assert!(!get_default_data_dir().to_string_lossy().is_empty());
    }
}
