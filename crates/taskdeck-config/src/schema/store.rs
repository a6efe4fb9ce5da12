//! Document store connection configuration.

use serde::{Deserialize, Serialize};

/// Which document store implementation a client process uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store; nothing is shared with other processes.
    #[default]
    Memory,
    /// A `taskdeck-server` reached over WebSocket.
    Remote,
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// WebSocket URL of the store server (remote backend only).
    pub url: String,
    /// Seconds to wait for the WebSocket handshake (valid range: 1-120).
    pub connect_timeout: u32,
    /// Seconds to wait for a request acknowledgement (valid range: 1-120).
    pub request_timeout: u32,
    /// Heartbeat interval in seconds (valid range: 5-300).
    pub heartbeat_interval: u32,
    /// Reconnect base delay in seconds (valid range: 1-60).
    pub reconnect_delay: u32,
    /// Maximum reconnect delay in seconds (valid range: 1-600).
    pub max_reconnect_delay: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "ws://127.0.0.1:7070/ws".into(),
            connect_timeout: 15,
            request_timeout: 10,
            heartbeat_interval: 25,
            reconnect_delay: 1,
            max_reconnect_delay: 30,
        }
    }
}
