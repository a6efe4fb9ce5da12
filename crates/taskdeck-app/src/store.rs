//! Builds the document store a command talks to.

use std::sync::Arc;
use std::time::Duration;

use taskdeck_config::{StoreBackend, StoreConfig};
use taskdeck_store::{DocumentStore, MemoryStore, RemoteConfig, RemoteStore};

/// The store for one CLI session.
pub enum Backend {
    Memory(MemoryStore),
    Remote(RemoteStore),
}

impl Backend {
    /// Connect according to `config`. `subject_id` is announced to a remote
    /// server; a remote that cannot be reached in time is still returned,
    /// and keeps reconnecting in the background.
    pub async fn connect(config: &StoreConfig, subject_id: Option<&str>) -> Self {
        match config.backend {
            StoreBackend::Memory => {
                tracing::debug!("Using in-process store");
                Backend::Memory(MemoryStore::new())
            }
            StoreBackend::Remote => {
                let remote = RemoteStore::connect(remote_config(config, subject_id));
                let timeout = Duration::from_secs(u64::from(config.connect_timeout));
                if !remote.wait_connected(timeout).await {
                    tracing::warn!(url = %config.url, "Store server not reachable yet, continuing offline");
                }
                Backend::Remote(remote)
            }
        }
    }

    pub fn shared(&self) -> Arc<dyn DocumentStore> {
        match self {
            Backend::Memory(store) => Arc::new(store.clone()),
            Backend::Remote(store) => Arc::new(store.clone()),
        }
    }

    pub async fn close(self) {
        if let Backend::Remote(store) = self {
            store.disconnect().await;
        }
    }
}

fn remote_config(config: &StoreConfig, subject_id: Option<&str>) -> RemoteConfig {
    RemoteConfig {
        url: config.url.clone(),
        subject_id: subject_id.map(str::to_string),
        connect_timeout_secs: u64::from(config.connect_timeout),
        request_timeout_secs: u64::from(config.request_timeout),
        heartbeat_interval_secs: u64::from(config.heartbeat_interval),
        reconnect_delay_secs: u64::from(config.reconnect_delay),
        max_reconnect_delay_secs: u64::from(config.max_reconnect_delay),
    }
}
