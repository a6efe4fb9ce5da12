//! Configuration, shared connection state and internal commands.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use taskdeck_common::StoreError;
use tokio::sync::{oneshot, watch, Mutex};

use crate::document::{Document, Snapshot};
use crate::path::CollectionRef;
use crate::protocol::ClientFrame;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to a store server.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// WebSocket URL, e.g. `ws://127.0.0.1:7070/ws`.
    pub url: String,
    /// Subject id announced in the hello; `None` connects read-only.
    pub subject_id: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub heartbeat_interval_secs: u64,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:7070/ws".into(),
            subject_id: None,
            connect_timeout_secs: 15,
            request_timeout_secs: 10,
            heartbeat_interval_secs: 25,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Replies & Commands
// ---------------------------------------------------------------------------

/// Successful answer to a request frame.
#[derive(Debug)]
pub(crate) enum Reply {
    Ack,
    Document(Option<Document>),
    Snapshot(Snapshot),
}

pub(crate) type ReplyTx = oneshot::Sender<Result<Reply, StoreError>>;

/// Commands sent from `RemoteStore` handles to the connection task.
#[derive(Debug)]
pub(crate) enum Command {
    Request { frame: ClientFrame, reply: ReplyTx },
    Watch { collection: CollectionRef },
    Unwatch { collection: CollectionRef },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State shared between handles and the connection task.
pub(crate) struct Shared {
    pub(crate) connected: watch::Sender<bool>,
    pub(crate) pending: Mutex<HashMap<String, ReplyTx>>,
    /// Live queries by collection, re-registered on every reconnect.
    pub(crate) watches: Mutex<HashMap<CollectionRef, watch::Sender<Option<Snapshot>>>>,
    shutdown: AtomicBool,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            connected: watch::channel(false).0,
            pending: Mutex::new(HashMap::new()),
            watches: Mutex::new(HashMap::new()),
            shutdown: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub(crate) fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Fail every in-flight request.
    pub(crate) async fn fail_pending(&self, reason: &str) {
        let mut pending = self.pending.lock().await;
        for (_, reply) in pending.drain() {
            let _ = reply.send(Err(StoreError::Unavailable(reason.to_string())));
        }
    }
}
