//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use crate::schema::{LogLevel, StoreBackend, TaskdeckConfig};
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_parse_error() {
    let result = load_from_path(Path::new("/tmp/nonexistent_taskdeck_config.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, taskdeck_common::ConfigError::ParseError(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[store]
backend = "remote"
url = "wss://deck.example.com/ws"

[presence]
include_self = false
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.store.backend, StoreBackend::Remote);
    assert_eq!(config.store.url, "wss://deck.example.com/ws");
    assert!(!config.presence.include_self);
    // Defaults preserved
    assert!(config.presence.enabled);
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, taskdeck_common::ConfigError::ParseError(_)));
}

#[test]
fn load_keeps_out_of_range_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[store]\nheartbeat_interval = 1\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.store.heartbeat_interval, 1);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskdeck").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.server.port, 7070);
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;

    let config: TaskdeckConfig = toml::from_str(&default_config_toml()).unwrap();
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn default_config_path_is_reasonable() {
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("taskdeck"));
        assert!(path_str.ends_with("config.toml"));
    }
}
