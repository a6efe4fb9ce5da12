//! Store and server section validators.

use super::helpers::{validate_range, validate_scheme};
use crate::schema::{StoreBackend, TaskdeckConfig};

/// Validate store connection settings.
pub(crate) fn validate_store(errors: &mut Vec<String>, config: &TaskdeckConfig) {
    let store = &config.store;
    validate_range(errors, "store.connect_timeout", store.connect_timeout, 1, 120);
    validate_range(errors, "store.request_timeout", store.request_timeout, 1, 120);
    validate_range(errors, "store.heartbeat_interval", store.heartbeat_interval, 5, 300);
    validate_range(errors, "store.reconnect_delay", store.reconnect_delay, 1, 60);
    validate_range(errors, "store.max_reconnect_delay", store.max_reconnect_delay, 1, 600);

    if store.max_reconnect_delay < store.reconnect_delay {
        errors.push(format!(
            "store.max_reconnect_delay = {} is below store.reconnect_delay = {}",
            store.max_reconnect_delay, store.reconnect_delay
        ));
    }

    if store.backend == StoreBackend::Remote {
        validate_scheme(errors, "store.url", &store.url, &["ws://", "wss://"]);
    }
}

/// Validate server settings.
pub(crate) fn validate_server(errors: &mut Vec<String>, config: &TaskdeckConfig) {
    let server = &config.server;
    if server.port == 0 {
        errors.push("server.port = 0 is out of range [1, 65535]".into());
    }
    if server.bind.trim().is_empty() {
        errors.push("server.bind must not be empty".into());
    }
    validate_range(errors, "server.hello_timeout", server.hello_timeout, 1, 60);
}
