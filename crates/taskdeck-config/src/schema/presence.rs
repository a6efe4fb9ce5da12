//! Task presence configuration.

use serde::{Deserialize, Serialize};

/// Presence tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceSettings {
    /// When false, the client never writes its own viewer record.
    pub enabled: bool,
    /// Whether the local viewer appears in its own viewer list.
    pub include_self: bool,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            include_self: true,
        }
    }
}
