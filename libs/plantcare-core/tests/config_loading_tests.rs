//! Configuration precedence and building the app context from it

use plantcare_core::{BackupLocation, ConfigLoader, PlantCareApp, PlantCareConfig};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_defaults_then_files_then_env() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");
    let system = temp_dir.path().join("system.json");
    let user = temp_dir.path().join("user.yml");
    std::fs::write(
        &system,
        serde_json::json!({
            "data_dir": data_dir,
            "device_label": "System default",
            "auto_backup_interval_hours": 48
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(&user, "device_label: My phone\nlog_level: debug\n").unwrap();

    let config = ConfigLoader::new()
        .with_config_paths(vec![&system, &user])
        .with_env_vars([
            ("PLANTCARE_LOG_LEVEL", "error"),
            ("PLANTCARE_JSON_LOGS", "true"),
            ("UNRELATED", "ignored"),
        ])
        .load()
        .unwrap();

    assert_eq!(config.data_dir, data_dir);
    assert_eq!(config.photo_dir, data_dir.join("photos"));
    assert_eq!(config.local_backup_dir, data_dir.join("backups"));
    assert_eq!(config.auto_backup_interval_hours, 48);
    assert_eq!(config.device_label, "My phone");
    assert_eq!(config.log_level, "error");
    assert!(config.json_logs);
}

#[test]
fn test_sample_config_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let sample = temp_dir.path().join("plantcare-config.json");
    ConfigLoader::create_sample_config(&sample, "json").unwrap();

    let config = ConfigLoader::new()
        .with_config_paths(vec![&sample])
        .without_env_loading()
        .load()
        .unwrap();
    assert_eq!(config, PlantCareConfig::default());
}

#[tokio::test]
async fn test_app_uses_cloud_directory_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let cloud = temp_dir.path().join("cloud");

    let config = ConfigLoader::new()
        .with_base_config(PlantCareConfig::for_data_dir(temp_dir.path().join("data")))
        .with_config_paths::<PathBuf>(vec![])
        .with_env_vars([("PLANTCARE_CLOUD_BACKUP_DIR", cloud.to_string_lossy().to_string())])
        .load()
        .unwrap();

    let mut app = PlantCareApp::new(config).await.unwrap();
    let backup = app.backup_now().await.unwrap();
    assert_eq!(backup.location, BackupLocation::Cloud);
    assert!(cloud.join(&backup.file_name).is_file());
    assert!(app.shutdown().is_none());
}
