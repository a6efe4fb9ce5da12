//! Core TOML config loading: read from path or platform default.

use crate::schema::TaskdeckConfig;
use std::path::Path;
use taskdeck_common::ConfigError;
use tracing::info;

use super::paths::{create_default_config, default_config_path};

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. Values are not range-checked
/// here; `load_config` validates.
pub fn load_from_path(path: &Path) -> Result<TaskdeckConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: TaskdeckConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On Linux: `~/.config/taskdeck/config.toml`
/// On macOS: `~/Library/Application Support/taskdeck/config.toml`
///
/// If the file does not exist, writes the documented default and returns defaults.
pub fn load_default() -> Result<TaskdeckConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("no config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(TaskdeckConfig::default());
    }

    load_from_path(&path)
}
