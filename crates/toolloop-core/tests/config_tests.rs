//! Configuration tests
//!
//! Loading, saving and validating the TOML configuration.

use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

use toolloop_core::session::LoopSettings;
use toolloop_core::{Config, ConfigManager};

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::with_path(dir.path().join("config.toml")).unwrap();
    assert_eq!(manager.config().agent.max_iterations, 30);
    assert_eq!(manager.config().model.model, "gemini-2.0-flash-001");
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut manager = ConfigManager::with_path(path.clone()).unwrap();
    {
        let config = manager.config_mut();
        config.model.model = "gemini-1.5-pro".into();
        config.model.api_key = Some("do-not-write".into());
        config.agent.max_iterations = 12;
        config.agent.retry_delay_secs = 0.25;
        config.agent.working_dir = Some(PathBuf::from("/srv/project"));
        config.history.enabled = false;
        config.tools.shell = false;
        config.general.log_level = "debug".into();
    }
    manager.save().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("[agent]"));
    assert!(!raw.contains("do-not-write"));

    let reloaded = ConfigManager::with_path(path).unwrap().into_config();
    assert_eq!(reloaded.model.model, "gemini-1.5-pro");
    assert!(reloaded.model.api_key.is_none());
    assert_eq!(reloaded.agent.max_iterations, 12);
    assert_eq!(reloaded.retry_delay(), Duration::from_millis(250));
    assert_eq!(reloaded.agent.working_dir, Some(PathBuf::from("/srv/project")));
    assert!(!reloaded.history.enabled);
    assert!(!reloaded.tools.shell);
    assert_eq!(reloaded.general.log_level, "debug");
}

#[test]
fn test_invalid_toml_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[agent\nmax_iterations = ").unwrap();

    let err = ConfigManager::with_path(path).err().unwrap();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn test_negative_retry_delay_rejected() {
    let mut config = Config::default();
    config.agent.retry_delay_secs = -1.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_data_paths_follow_data_dir() {
    let mut config = Config::default();
    config.history.data_dir = Some(PathBuf::from("/tmp/toolloop-data"));
    assert_eq!(config.sessions_dir(), PathBuf::from("/tmp/toolloop-data/sessions"));
    assert_eq!(config.metrics_path(), PathBuf::from("/tmp/toolloop-data/metrics.json"));
}

#[test]
fn test_loop_settings_from_config() {
    let config: Config = toml::from_str(
        r#"
[model]
temperature = 0.2
max_tokens = 1024
request_timeout_secs = 15

[agent]
max_iterations = 7
retry_attempts = 5
context_window = 4
"#,
    )
    .unwrap();
    config.validate().unwrap();

    let settings = LoopSettings::from_config(&config);
    assert_eq!(settings.max_iterations, 7);
    assert_eq!(settings.retry_attempts, 5);
    assert_eq!(settings.context_window, 4);
    assert_eq!(settings.max_tokens, 1024);
    assert_eq!(settings.request_timeout, Duration::from_secs(15));
    assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
}
