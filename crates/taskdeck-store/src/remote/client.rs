//! Public handle for a store served over WebSocket.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use taskdeck_common::{new_correlation_id, StoreError};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use super::connection::connection_loop;
use super::types::{Command, RemoteConfig, Reply, Shared};
use crate::document::{Document, Fields, Snapshot};
use crate::path::{CollectionRef, DocumentRef};
use crate::protocol::ClientFrame;
use crate::store::DocumentStore;
use crate::subscription::Subscription;

/// Monotonically increasing request counter shared by every store handle.
static REF_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Sends `Unwatch` once the last local subscriber of a collection goes away.
struct WatchGuard {
    collection: CollectionRef,
    command_tx: mpsc::Sender<Command>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        let unwatch = Command::Unwatch {
            collection: self.collection.clone(),
        };
        if let Err(e) = self.command_tx.try_send(unwatch) {
            match e {
                mpsc::error::TrySendError::Full(unwatch) => {
                    match tokio::runtime::Handle::try_current() {
                        Ok(handle) => {
                            debug!(collection = %self.collection, "Command queue full, deferring unwatch");
                            let command_tx = self.command_tx.clone();
                            handle.spawn(async move {
                                let _ = command_tx.send(unwatch).await;
                            });
                        }
                        Err(_) => {
                            warn!(collection = %self.collection, "Command queue full, unwatch dropped");
                        }
                    }
                }
                mpsc::error::TrySendError::Closed(_) => {
                    debug!(collection = %self.collection, "Connection task gone, nothing to unwatch");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`DocumentStore`] backed by a `taskdeck-server`.
///
/// Requests made while the connection is down fail fast with
/// [`StoreError::Unavailable`]. Live queries survive reconnects.
#[derive(Clone)]
pub struct RemoteStore {
    command_tx: mpsc::Sender<Command>,
    shared: Arc<Shared>,
    request_timeout: Duration,
    url: String,
    client_tag: Arc<str>,
}

impl RemoteStore {
    /// Create a handle and start the background connection task.
    pub fn connect(config: RemoteConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(64);
        let shared = Arc::new(Shared::new());
        let client_tag: Arc<str> = new_correlation_id().into();
        debug!(client = %client_tag, url = %config.url, "Starting remote store");

        let store = Self {
            command_tx,
            shared: Arc::clone(&shared),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            url: config.url.clone(),
            client_tag,
        };

        tokio::spawn(connection_loop(config, shared, command_rx));
        store
    }

    pub fn is_connected(&self) -> bool {
        *self.shared.connected.borrow()
    }

    /// Wait until the server has accepted our hello. Returns `false` on timeout.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut rx = self.shared.connected.subscribe();
        let connected = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|connected| *connected)).await,
            Ok(Ok(_))
        );
        connected
    }

    /// Close the connection and stop reconnecting. Live queries end.
    pub async fn disconnect(&self) {
        self.shared.request_shutdown();
        let _ = self.command_tx.send(Command::Shutdown).await;
    }

    /// Request ref of the form `<client tag>-<n>`.
    fn next_ref(&self) -> String {
        let n = REF_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.client_tag)
    }

    async fn request(&self, frame: ClientFrame) -> Result<Reply, StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Unavailable(format!(
                "not connected to {}",
                self.url
            )));
        }

        let req_ref = frame.req_ref().unwrap_or_default().to_string();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Request {
                frame,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::Unavailable("connection task stopped".into()))?;

        match tokio::time::timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(StoreError::Unavailable("connection lost".into())),
            Err(_) => {
                self.shared.pending.lock().await.remove(&req_ref);
                debug!(req_ref = %req_ref, "Request timed out");
                Err(StoreError::Timeout(format!(
                    "no reply within {}s",
                    self.request_timeout.as_secs()
                )))
            }
        }
    }
}

fn unexpected(reply: Reply) -> StoreError {
    StoreError::Protocol(format!("unexpected reply: {reply:?}"))
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn set(&self, doc: &DocumentRef, fields: Fields) -> Result<(), StoreError> {
        let frame = ClientFrame::Set {
            req_ref: self.next_ref(),
            path: doc.path(),
            fields,
        };
        match self.request(frame).await? {
            Reply::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<(), StoreError> {
        let frame = ClientFrame::Delete {
            req_ref: self.next_ref(),
            path: doc.path(),
        };
        match self.request(frame).await? {
            Reply::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, StoreError> {
        let frame = ClientFrame::Get {
            req_ref: self.next_ref(),
            path: doc.path(),
        };
        match self.request(frame).await? {
            Reply::Document(document) => Ok(document),
            other => Err(unexpected(other)),
        }
    }

    async fn list(&self, collection: &CollectionRef) -> Result<Snapshot, StoreError> {
        let frame = ClientFrame::List {
            req_ref: self.next_ref(),
            collection: collection.to_string(),
        };
        match self.request(frame).await? {
            Reply::Snapshot(snapshot) => Ok(snapshot),
            other => Err(unexpected(other)),
        }
    }

    async fn watch(&self, collection: &CollectionRef) -> Result<Subscription, StoreError> {
        if self.shared.is_shutdown() {
            return Err(StoreError::Unavailable("store disconnected".into()));
        }

        let (rx, first) = {
            let mut watches = self.shared.watches.lock().await;
            match watches.get(collection) {
                Some(tx) => (tx.subscribe(), false),
                None => {
                    let (tx, rx) = watch::channel(None);
                    watches.insert(collection.clone(), tx);
                    (rx, true)
                }
            }
        };

        if first {
            self.command_tx
                .send(Command::Watch {
                    collection: collection.clone(),
                })
                .await
                .map_err(|_| StoreError::Unavailable("connection task stopped".into()))?;
        }

        Ok(Subscription::new(collection.clone(), rx).with_guard(WatchGuard {
            collection: collection.clone(),
            command_tx: self.command_tx.clone(),
        }))
    }
}
