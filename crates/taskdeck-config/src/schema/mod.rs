//! Configuration schema types for Taskdeck.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod presence;
mod server;
mod store;

pub use logging::*;
pub use presence::*;
pub use server::*;
pub use store::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Taskdeck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskdeckConfig {
    pub store: StoreConfig,
    pub presence: PresenceSettings,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_store_is_in_process() {
        let config = TaskdeckConfig::default();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.url, "ws://127.0.0.1:7070/ws");
        assert_eq!(config.store.heartbeat_interval, 25);
        assert_eq!(config.store.reconnect_delay, 1);
        assert_eq!(config.store.max_reconnect_delay, 30);
    }

    #[test]
    fn default_presence_includes_self() {
        let config = TaskdeckConfig::default();
        assert!(config.presence.enabled);
        assert!(config.presence.include_self);
    }

    #[test]
    fn default_server_keeps_stale_records() {
        let config = TaskdeckConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 7070);
        assert!(!config.server.reap_on_disconnect);
        assert_eq!(config.server.hello_timeout, 10);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: TaskdeckConfig = toml::from_str(
            r#"
[store]
backend = "remote"

[logging]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Remote);
        assert_eq!(config.store.request_timeout, 10);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.server.port, 7070);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let result: Result<TaskdeckConfig, _> = toml::from_str("[store]\nbackend = \"firebase\"\n");
        assert!(result.is_err());
    }
}
