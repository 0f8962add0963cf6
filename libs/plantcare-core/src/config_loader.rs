//! Configuration Loader
//!
//! Loads [`PlantCareConfig`] from defaults, configuration files and the
//! environment, in increasing order of precedence, then validates it.

use crate::config::{ConfigOverrides, PlantCareConfig};
use crate::error::{PlantCareError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_FILE_STEM: &str = "plantcare-config";
const CONFIG_DIR_NAME: &str = "plantcare";

/// Where environment overrides come from
#[derive(Debug, Clone)]
enum EnvSource {
    Disabled,
    Process,
    Fixed(HashMap<String, String>),
}

/// Configuration loader that handles multiple sources with precedence
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_config: PlantCareConfig,
    /// Configuration file paths to try in order; later files win
    config_paths: Vec<PathBuf>,
    env: EnvSource,
    validate: bool,
}

impl ConfigLoader {
    /// Loader over the default paths and the process environment
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_config: PlantCareConfig::default(),
            config_paths: Self::get_default_config_paths(),
            env: EnvSource::Process,
            validate: true,
        }
    }

    #[must_use]
    pub fn with_base_config(mut self, config: PlantCareConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Add a configuration file path
    #[must_use]
    pub fn add_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Replace the configuration file paths
    #[must_use]
    pub fn with_config_paths<P: AsRef<Path>>(mut self, paths: Vec<P>) -> Self {
        self.config_paths = paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        self
    }

    #[must_use]
    pub fn without_env_loading(mut self) -> Self {
        self.env = EnvSource::Disabled;
        self
    }

    /// Enable or disable loading from the process environment
    #[must_use]
    pub fn with_env_loading(mut self, enabled: bool) -> Self {
        self.env = if enabled {
            EnvSource::Process
        } else {
            EnvSource::Disabled
        };
        self
    }

    /// Read `PLANTCARE_*` variables from `vars` instead of the process environment
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = EnvSource::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Load configuration from all sources
    ///
    /// Files that exist but cannot be parsed, and environment variables that
    /// cannot be parsed, are logged and skipped.
    ///
    /// # Errors
    /// Returns a configuration error if validation is enabled and the final
    /// configuration is invalid
    pub fn load(&self) -> Result<PlantCareConfig> {
        let mut config = self.base_config.clone();
        info!("Starting configuration loading process");

        for path in &self.config_paths {
            if !path.exists() {
                debug!("Configuration file not found: {}", path.display());
                continue;
            }
            debug!("Loading configuration from file: {}", path.display());
            match ConfigOverrides::from_file(path) {
                Ok(overrides) => {
                    config.merge_with(&overrides);
                    info!("Loaded configuration from: {}", path.display());
                }
                Err(e) => warn!(
                    "Failed to load configuration from {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        let env_overrides = match &self.env {
            EnvSource::Disabled => None,
            EnvSource::Process => Some(ConfigOverrides::from_env()),
            EnvSource::Fixed(vars) => Some(ConfigOverrides::from_lookup(|key| vars.get(key).cloned())),
        };
        match env_overrides {
            Some(Ok(overrides)) if !overrides.is_empty() => {
                config.merge_with(&overrides);
                info!("Loaded configuration from environment variables");
            }
            Some(Ok(_)) | None => {}
            Some(Err(e)) => warn!(
                "Failed to load configuration from environment variables: {}",
                e
            ),
        }

        if self.validate {
            config.validate()?;
            debug!("Configuration validation passed");
        }

        Ok(config)
    }

    /// Default configuration file paths, lowest precedence first
    #[must_use]
    pub fn get_default_config_paths() -> Vec<PathBuf> {
        let file_names = ["json", "yaml", "yml"].map(|ext| format!("{CONFIG_FILE_STEM}.{ext}"));
        let system_dir = Self::get_system_config_dir();
        let user_dir = Self::get_user_config_dir();

        let mut paths = Vec::with_capacity(file_names.len() * 3);
        paths.extend(file_names.iter().map(|name| system_dir.join(name)));
        paths.extend(file_names.iter().map(|name| user_dir.join(name)));
        paths.extend(file_names.iter().map(PathBuf::from));
        paths
    }

    #[must_use]
    pub fn get_user_config_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".config").join(CONFIG_DIR_NAME)
        } else if let Ok(userprofile) = std::env::var("USERPROFILE") {
            PathBuf::from(userprofile)
                .join("AppData")
                .join("Roaming")
                .join(CONFIG_DIR_NAME)
        } else {
            PathBuf::from("~/.config").join(CONFIG_DIR_NAME)
        }
    }

    #[must_use]
    pub fn get_system_config_dir() -> PathBuf {
        if cfg!(target_os = "macos") {
            PathBuf::from("/Library/Application Support").join(CONFIG_DIR_NAME)
        } else if cfg!(target_os = "windows") {
            PathBuf::from("C:\\ProgramData").join(CONFIG_DIR_NAME)
        } else {
            PathBuf::from("/etc").join(CONFIG_DIR_NAME)
        }
    }

    /// Write the default configuration as a starting point
    ///
    /// # Arguments
    /// * `path` - Path of the sample file
    /// * `format` - "json" or "yaml"
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be created
    pub fn create_sample_config<P: AsRef<Path>>(path: P, format: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PlantCareError::configuration(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        PlantCareConfig::default().to_file(path, format)?;
        info!("Created sample configuration file: {}", path.display());
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration from the default paths and the environment
///
/// # Errors
/// Returns an error if the resulting configuration is invalid
pub fn load_config() -> Result<PlantCareConfig> {
    ConfigLoader::new().load()
}

/// Load configuration with custom paths
///
/// # Errors
/// Returns an error if the resulting configuration is invalid
pub fn load_config_with_paths<P: AsRef<Path>>(config_paths: Vec<P>) -> Result<PlantCareConfig> {
    ConfigLoader::new().with_config_paths(config_paths).load()
}

/// Load configuration from environment variables only
///
/// # Errors
/// Returns an error if the resulting configuration is invalid
pub fn load_config_from_env() -> Result<PlantCareConfig> {
    ConfigLoader::new()
        .with_config_paths::<PathBuf>(vec![])
        .load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base(temp_dir: &TempDir) -> PlantCareConfig {
        PlantCareConfig::for_data_dir(temp_dir.path().join("data"))
    }

    #[test]
    fn test_config_loader_default() {
        let loader = ConfigLoader::new();
        assert!(matches!(loader.env, EnvSource::Process));
        assert!(loader.validate);
        assert_eq!(loader.config_paths.len(), 9);
    }

    #[test]
    fn test_base_config_without_sources() {
        let temp_dir = TempDir::new().unwrap();
        let mut base_config = base(&temp_dir);
        base_config.device_label = "Windowsill".to_string();

        let loaded = ConfigLoader::new()
            .with_base_config(base_config.clone())
            .with_config_paths::<PathBuf>(vec![])
            .without_env_loading()
            .load()
            .unwrap();
        assert_eq!(loaded, base_config);
    }

    #[test]
    fn test_files_then_env_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.yaml");
        let second = temp_dir.path().join("second.json");
        std::fs::write(&first, "device_label: First\nlog_level: debug\njson_logs: true\n").unwrap();
        std::fs::write(&second, r#"{"device_label": "Second"}"#).unwrap();

        let loaded = ConfigLoader::new()
            .with_base_config(base(&temp_dir))
            .with_config_paths(vec![&first, &second])
            .with_env_vars([("PLANTCARE_LOG_LEVEL", "warn")])
            .load()
            .unwrap();

        assert_eq!(loaded.device_label, "Second");
        assert_eq!(loaded.log_level, "warn");
        assert!(loaded.json_logs);
    }

    #[test]
    fn test_broken_file_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let broken = temp_dir.path().join("broken.json");
        std::fs::write(&broken, "{ nope").unwrap();

        let loaded = ConfigLoader::new()
            .with_base_config(base(&temp_dir))
            .with_config_paths(vec![&broken, &temp_dir.path().join("missing.yaml")])
            .without_env_loading()
            .load()
            .unwrap();
        assert_eq!(loaded, base(&temp_dir));
    }

    #[test]
    fn test_bad_env_value_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = ConfigLoader::new()
            .with_base_config(base(&temp_dir))
            .with_config_paths::<PathBuf>(vec![])
            .with_env_vars([("PLANTCARE_AUTO_BACKUP_HOURS", "often")])
            .load()
            .unwrap();
        assert_eq!(loaded.auto_backup_interval_hours, 24);
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new()
            .with_base_config(base(&temp_dir))
            .with_config_paths::<PathBuf>(vec![])
            .with_env_vars([("PLANTCARE_LOG_LEVEL", "chatty")]);

        assert!(matches!(
            loader.load(),
            Err(PlantCareError::Configuration { .. })
        ));
        assert_eq!(
            loader.with_validation(false).load().unwrap().log_level,
            "chatty"
        );
    }

    #[test]
    fn test_get_default_config_paths() {
        let paths = ConfigLoader::get_default_config_paths();
        assert!(paths
            .iter()
            .any(|p| p.file_name().unwrap() == "plantcare-config.yaml"));
        assert_eq!(paths.last().unwrap(), &PathBuf::from("plantcare-config.yml"));
        assert!(ConfigLoader::get_user_config_dir()
            .to_string_lossy()
            .contains("plantcare"));
        assert!(ConfigLoader::get_system_config_dir()
            .to_string_lossy()
            .contains("plantcare"));
    }

    #[test]
    fn test_create_sample_config() {
        let temp_dir = TempDir::new().unwrap();
        let yaml_file = temp_dir.path().join("nested").join("sample.yaml");

        ConfigLoader::create_sample_config(&yaml_file, "yaml").unwrap();
        let loaded = ConfigLoader::new()
            .with_config_paths(vec![&yaml_file])
            .without_env_loading()
            .load()
            .unwrap();
        assert_eq!(loaded, PlantCareConfig::default());
    }
}
