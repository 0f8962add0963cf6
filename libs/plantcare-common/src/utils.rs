//! Utility functions shared by the plantcare crates

use crate::constants::{BACKUP_FILE_EXTENSION, BACKUP_FILE_PREFIX, BACKUP_TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Get the default data directory
#[must_use]
pub fn get_default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
    PathBuf::from(format!("{home}/.local/share/plantcare"))
}

/// Truncate a string to a maximum number of characters, appending `...`
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Build the file name of a backup snapshot
///
/// `attempt` 1 yields the plain name; higher attempts append ` (n)` so that a
/// second backup within the same minute never replaces the first.
#[must_use]
pub fn backup_file_name(timestamp: &NaiveDateTime, attempt: u32) -> String {
    let stamp = timestamp.format(BACKUP_TIMESTAMP_FORMAT);
    if attempt <= 1 {
        format!("{BACKUP_FILE_PREFIX} {stamp}.{BACKUP_FILE_EXTENSION}")
    } else {
        format!("{BACKUP_FILE_PREFIX} {stamp} ({attempt}).{BACKUP_FILE_EXTENSION}")
    }
}

/// Whether a file name carries the backup snapshot extension
#[must_use]
pub fn is_backup_file_name(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext == BACKUP_FILE_EXTENSION)
}

/// Recover the timestamp encoded in a backup file name
#[must_use]
pub fn parse_backup_file_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name.strip_suffix(&format!(".{BACKUP_FILE_EXTENSION}"))?;
    let rest = stem.strip_prefix(BACKUP_FILE_PREFIX)?.trim_start();
    // "YYYY-MM-DD HH-MM" is 16 characters; anything after is a collision suffix
    let stamp = rest.get(..16)?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT).ok()
}
