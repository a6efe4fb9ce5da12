//! Taskdeck configuration system.
//!
//! TOML-based configuration for the document store connection, the
//! presence tracker, the store server and logging. Every section uses
//! serde defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use taskdeck_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    LogLevel, LoggingConfig, PresenceSettings, ServerConfig, StoreBackend, StoreConfig,
    TaskdeckConfig, CONFIG_SCHEMA_VERSION,
};

use std::path::Path;

use taskdeck_common::ConfigError;

/// Load config from `path` if given, otherwise from the platform default path.
///
/// The default path gets a documented template written on first run. An
/// explicit path must exist. The result is validated; validation errors are
/// returned to the caller.
pub fn load_config(path: Option<&Path>) -> Result<TaskdeckConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            toml_loader::load_from_path(path)?
        }
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &TaskdeckConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = TaskdeckConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"store\""));
        assert!(json.contains("\"presence\""));
        assert!(json.contains("\"server\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = TaskdeckConfig::default();
        let json = config_to_json(&config);
        let parsed: TaskdeckConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.store.backend, StoreBackend::Memory);
        assert_eq!(parsed.server.port, 7070);
        assert!(parsed.presence.include_self);
    }

    #[test]
    fn explicit_missing_path_is_file_not_found() {
        let err = load_config(Some(Path::new("/tmp/taskdeck_missing_config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn explicit_path_with_invalid_values_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn out_of_range_values_are_rejected_once_by_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\nheartbeat_interval = 1\n").unwrap();

        let parsed = toml_loader::load_from_path(&path).unwrap();
        assert_eq!(parsed.store.heartbeat_interval, 1);

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
