//! Runtime configuration
//!
//! [`PlantCareConfig`] is the resolved configuration. Files and environment
//! variables are read into [`ConfigOverrides`], where every field is optional,
//! so that a source only replaces the values it actually sets.

use crate::error::{PlantCareError, Result};
use plantcare_common::{get_default_data_dir, AUTO_BACKUP_INTERVAL_HOURS, PHOTO_DIR_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the local backup directory inside the data directory
pub const BACKUP_DIR_NAME: &str = "backups";

/// Prefix shared by every configuration environment variable
pub const ENV_PREFIX: &str = "PLANTCARE_";

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Resolved configuration of a plant care process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantCareConfig {
    /// Directory holding the persisted collections
    pub data_dir: PathBuf,
    /// Directory holding plant photos
    pub photo_dir: PathBuf,
    /// Backup directory used when no cloud directory is reachable
    pub local_backup_dir: PathBuf,
    /// Synced directory preferred for backups
    pub cloud_backup_dir: Option<PathBuf>,
    /// Label written into snapshot metadata
    pub device_label: String,
    /// Minimum hours between automatic backups
    pub auto_backup_interval_hours: i64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of text
    pub json_logs: bool,
}

impl Default for PlantCareConfig {
    fn default() -> Self {
        Self::for_data_dir(get_default_data_dir())
    }
}

impl PlantCareConfig {
    /// Default configuration with everything stored under `data_dir`
    #[must_use]
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            photo_dir: data_dir.join(PHOTO_DIR_NAME),
            local_backup_dir: data_dir.join(BACKUP_DIR_NAME),
            data_dir,
            cloud_backup_dir: None,
            device_label: default_device_label(),
            auto_backup_interval_hours: AUTO_BACKUP_INTERVAL_HOURS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Defaults overridden by `PLANTCARE_*` environment variables
    ///
    /// # Errors
    /// Returns a configuration error if a variable cannot be parsed
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.merge_with(&ConfigOverrides::from_env()?);
        Ok(config)
    }

    /// Defaults overridden by a YAML or JSON file
    ///
    /// # Errors
    /// Returns a configuration error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::default();
        config.merge_with(&ConfigOverrides::from_file(path)?);
        Ok(config)
    }

    /// Write the full configuration
    ///
    /// # Arguments
    /// * `path` - Destination file
    /// * `format` - "json" or "yaml"
    ///
    /// # Errors
    /// Returns a configuration error for an unknown format or if the file
    /// cannot be written
    pub fn to_file<P: AsRef<Path>>(&self, path: P, format: &str) -> Result<()> {
        let path = path.as_ref();
        let content = match format {
            "json" => serde_json::to_string_pretty(self).map_err(|e| {
                PlantCareError::configuration(format!("Failed to serialize config to JSON: {e}"))
            })?,
            "yaml" | "yml" => serde_yaml::to_string(self).map_err(|e| {
                PlantCareError::configuration(format!("Failed to serialize config to YAML: {e}"))
            })?,
            other => {
                return Err(PlantCareError::configuration(format!(
                    "Unsupported config format: {other}"
                )))
            }
        };

        std::fs::write(path, content).map_err(|e| {
            PlantCareError::configuration(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Check the configuration for values the process cannot run with
    ///
    /// # Errors
    /// Returns a configuration error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(PlantCareError::configuration("Data directory cannot be empty"));
        }
        if self.photo_dir.as_os_str().is_empty() {
            return Err(PlantCareError::configuration(
                "Photo directory cannot be empty",
            ));
        }
        if self.local_backup_dir.as_os_str().is_empty() {
            return Err(PlantCareError::configuration(
                "Local backup directory cannot be empty",
            ));
        }
        if self.cloud_backup_dir.as_deref() == Some(self.local_backup_dir.as_path()) {
            return Err(PlantCareError::configuration(
                "Cloud and local backup directories must differ",
            ));
        }
        if self.device_label.trim().is_empty() {
            return Err(PlantCareError::configuration("Device label cannot be empty"));
        }
        if self.auto_backup_interval_hours <= 0 {
            return Err(PlantCareError::configuration(
                "Automatic backup interval must be at least one hour",
            ));
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(PlantCareError::configuration(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    /// Apply every value `overrides` sets
    ///
    /// Photo and backup directories that still point inside the old data
    /// directory follow a changed data directory unless they are set too.
    pub fn merge_with(&mut self, overrides: &ConfigOverrides) {
        if let Some(data_dir) = &overrides.data_dir {
            if self.photo_dir == self.data_dir.join(PHOTO_DIR_NAME) {
                self.photo_dir = data_dir.join(PHOTO_DIR_NAME);
            }
            if self.local_backup_dir == self.data_dir.join(BACKUP_DIR_NAME) {
                self.local_backup_dir = data_dir.join(BACKUP_DIR_NAME);
            }
            self.data_dir.clone_from(data_dir);
        }
        if let Some(photo_dir) = &overrides.photo_dir {
            self.photo_dir.clone_from(photo_dir);
        }
        if let Some(local_backup_dir) = &overrides.local_backup_dir {
            self.local_backup_dir.clone_from(local_backup_dir);
        }
        if let Some(cloud_backup_dir) = &overrides.cloud_backup_dir {
            self.cloud_backup_dir = Some(cloud_backup_dir.clone());
        }
        if let Some(device_label) = &overrides.device_label {
            self.device_label.clone_from(device_label);
        }
        if let Some(hours) = overrides.auto_backup_interval_hours {
            self.auto_backup_interval_hours = hours;
        }
        if let Some(log_level) = &overrides.log_level {
            self.log_level = log_level.to_lowercase();
        }
        if let Some(json_logs) = overrides.json_logs {
            self.json_logs = json_logs;
        }
    }
}

/// Partial configuration read from one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub photo_dir: Option<PathBuf>,
    pub local_backup_dir: Option<PathBuf>,
    pub cloud_backup_dir: Option<PathBuf>,
    pub device_label: Option<String>,
    pub auto_backup_interval_hours: Option<i64>,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

impl ConfigOverrides {
    /// Read `PLANTCARE_*` variables from the process environment
    ///
    /// # Errors
    /// Returns a configuration error if a variable cannot be parsed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `PLANTCARE_*` variables through `lookup`
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// Returns a configuration error if a variable cannot be parsed
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty())
        };

        let auto_backup_interval_hours = get("AUTO_BACKUP_HOURS")
            .map(|v| {
                v.trim().parse::<i64>().map_err(|_| {
                    PlantCareError::configuration(format!(
                        "Invalid PLANTCARE_AUTO_BACKUP_HOURS value: {v}"
                    ))
                })
            })
            .transpose()?;
        let json_logs = get("JSON_LOGS").map(|v| parse_bool(&v)).transpose()?;

        Ok(Self {
            data_dir: get("DATA_DIR").map(PathBuf::from),
            photo_dir: get("PHOTO_DIR").map(PathBuf::from),
            local_backup_dir: get("BACKUP_DIR").map(PathBuf::from),
            cloud_backup_dir: get("CLOUD_BACKUP_DIR").map(PathBuf::from),
            device_label: get("DEVICE_LABEL"),
            auto_backup_interval_hours,
            log_level: get("LOG_LEVEL"),
            json_logs,
        })
    }

    /// Read a YAML (`.yaml`/`.yml`) or JSON file
    ///
    /// # Errors
    /// Returns a configuration error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlantCareError::configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| {
                PlantCareError::configuration(format!("Failed to parse YAML config: {e}"))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                PlantCareError::configuration(format!("Failed to parse JSON config: {e}"))
            })
        }
    }

    /// Whether this source sets nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PlantCareError::configuration(format!(
            "Invalid PLANTCARE_JSON_LOGS value: {value}"
        ))),
    }
}

fn default_device_label() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "This device".to_string())
}
