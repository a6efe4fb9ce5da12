use serde::{Deserialize, Serialize};

/// Configuration for `taskdeck-server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: String,
    pub port: u16,
    /// Delete viewer records last written by a connection when it drops.
    pub reap_on_disconnect: bool,
    /// Seconds a new connection has to send its hello (valid range: 1-60).
    pub hello_timeout: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 7070,
            reap_on_disconnect: false,
            hello_timeout: 10,
        }
    }
}
