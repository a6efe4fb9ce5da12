//! Per-connection handler: hello, then request dispatch and live queries.

use std::collections::HashMap;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use taskdeck_common::{ConnectionId, StoreError};
use taskdeck_store::{
    ClientFrame, CollectionRef, DocumentRef, DocumentStore, MemoryStore, ScopedStore, ServerFrame,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::ServerState;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// Everything one connection owns.
struct Session {
    id: ConnectionId,
    addr: SocketAddr,
    store: ScopedStore<MemoryStore>,
    state: ServerState,
    live_tx: mpsc::Sender<ServerFrame>,
    watches: HashMap<CollectionRef, JoinHandle<()>>,
}

/// Handle a single WebSocket connection.
pub async fn handle_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, state: ServerState) {
    let (mut sink, mut stream) = ws.split();

    // 1. The first frame names the subject.
    let subject_id = match read_hello(&mut stream, addr, &state).await {
        Ok(subject_id) => subject_id,
        Err(e) => {
            let _ = send_frame(&mut sink, &ServerFrame::error(None, &e)).await;
            return;
        }
    };

    let id = ConnectionId::new();
    let (live_tx, mut live_rx) = mpsc::channel::<ServerFrame>(256);
    let mut session = Session {
        id: id.clone(),
        addr,
        store: ScopedStore::new(
            state.store.clone(),
            subject_id.clone(),
            state.policy.clone(),
        ),
        state,
        live_tx,
        watches: HashMap::new(),
    };

    tracing::info!(
        peer = %addr,
        connection = %id,
        subject = ?subject_id,
        "Client connected"
    );

    // 2. Send ready.
    let ready = ServerFrame::Ready {
        connection_id: id.to_string(),
    };
    if send_frame(&mut sink, &ready).await.is_err() {
        session.close().await;
        return;
    }

    // 3. Request loop.
    loop {
        tokio::select! {
            Some(frame) = live_rx.recv() => {
                if send_frame(&mut sink, &frame).await.is_err() {
                    break;
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientFrame>(text.as_str()) {
                            Ok(frame) => session.dispatch(frame).await,
                            Err(e) => Some(ServerFrame::error(None, &StoreError::from(e))),
                        };
                        if let Some(reply) = reply {
                            if send_frame(&mut sink, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 4. Cleanup.
    session.close().await;
}

impl Session {
    /// Handle one client frame. Returns the reply to send, if any.
    async fn dispatch(&mut self, frame: ClientFrame) -> Option<ServerFrame> {
        let req_ref = frame.req_ref().map(str::to_string);
        match self.execute(frame).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(connection = %self.id, error = %e, "Request failed");
                Some(ServerFrame::error(req_ref, &e))
            }
        }
    }

    async fn execute(&mut self, frame: ClientFrame) -> Result<Option<ServerFrame>, StoreError> {
        match frame {
            ClientFrame::Hello { .. } => Err(StoreError::Protocol("duplicate hello".into())),
            ClientFrame::Set {
                req_ref,
                path,
                fields,
            } => {
                let doc = DocumentRef::parse(&path)?;
                if self.state.options.reap_on_disconnect {
                    self.state
                        .writers
                        .set(&self.store, &doc, fields, &self.id)
                        .await?;
                } else {
                    self.store.set(&doc, fields).await?;
                }
                Ok(Some(ServerFrame::Ack { req_ref }))
            }
            ClientFrame::Delete { req_ref, path } => {
                let doc = DocumentRef::parse(&path)?;
                if self.state.options.reap_on_disconnect {
                    self.state.writers.delete(&self.store, &doc).await?;
                } else {
                    self.store.delete(&doc).await?;
                }
                Ok(Some(ServerFrame::Ack { req_ref }))
            }
            ClientFrame::Get { req_ref, path } => {
                let doc = DocumentRef::parse(&path)?;
                let document = self.store.get(&doc).await?;
                Ok(Some(ServerFrame::Document { req_ref, document }))
            }
            ClientFrame::List {
                req_ref,
                collection,
            } => {
                let collection = CollectionRef::parse(&collection)?;
                let snapshot = self.store.list(&collection).await?;
                Ok(Some(ServerFrame::snapshot(snapshot, Some(req_ref))))
            }
            ClientFrame::Watch { collection } => {
                let collection = CollectionRef::parse(&collection)?;
                self.watch(collection).await?;
                Ok(None)
            }
            ClientFrame::Unwatch { collection } => {
                let collection = CollectionRef::parse(&collection)?;
                if let Some(task) = self.watches.remove(&collection) {
                    task.abort();
                    tracing::debug!(connection = %self.id, collection = %collection, "Unwatched");
                }
                Ok(None)
            }
            ClientFrame::Heartbeat => Ok(None),
        }
    }

    /// Start forwarding live snapshots of `collection` to this client.
    async fn watch(&mut self, collection: CollectionRef) -> Result<(), StoreError> {
        if self.watches.contains_key(&collection) {
            return Ok(());
        }
        let mut subscription = self.store.watch(&collection).await?;
        let live_tx = self.live_tx.clone();
        let task = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                if live_tx.send(ServerFrame::snapshot(snapshot, None)).await.is_err() {
                    break;
                }
            }
        });
        tracing::debug!(connection = %self.id, collection = %collection, "Watching");
        self.watches.insert(collection, task);
        Ok(())
    }

    async fn close(&mut self) {
        for (_, task) in self.watches.drain() {
            task.abort();
        }

        let reaped = if self.state.options.reap_on_disconnect {
            self.state.writers.reap(&self.state.store, &self.id).await
        } else {
            0
        };

        tracing::info!(
            peer = %self.addr,
            connection = %self.id,
            reaped,
            "Client disconnected"
        );
    }
}

/// Read and parse the first frame as a hello. Returns the announced subject.
async fn read_hello(
    stream: &mut WsStream,
    addr: SocketAddr,
    state: &ServerState,
) -> Result<Option<String>, StoreError> {
    let timeout = state.options.hello_timeout;
    let frame = tokio::time::timeout(timeout, stream.next()).await;

    match frame {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str::<ClientFrame>(text.as_str()) {
            Ok(ClientFrame::Hello { subject_id }) => Ok(subject_id.filter(|s| !s.is_empty())),
            Ok(_) => {
                tracing::warn!(peer = %addr, "First frame was not a hello");
                Err(StoreError::Protocol("expected hello".into()))
            }
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "Invalid hello message");
                Err(StoreError::from(e))
            }
        },
        Ok(Some(Ok(_))) => {
            tracing::warn!(peer = %addr, "Expected text hello, got binary");
            Err(StoreError::Protocol("expected text hello".into()))
        }
        Ok(Some(Err(e))) => {
            tracing::warn!(peer = %addr, error = %e, "WS error during hello");
            Err(StoreError::Protocol(e.to_string()))
        }
        Ok(None) => {
            tracing::debug!(peer = %addr, "Connection closed before hello");
            Err(StoreError::Protocol("closed before hello".into()))
        }
        Err(_) => {
            tracing::warn!(peer = %addr, timeout = ?timeout, "Hello timeout");
            Err(StoreError::Timeout("no hello received".into()))
        }
    }
}

/// Send a ServerFrame as a JSON text frame.
async fn send_frame(
    sink: &mut WsSink,
    frame: &ServerFrame,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let json = serde_json::to_string(frame)
        .map_err(|e| tokio_tungstenite::tungstenite::Error::Io(std::io::Error::other(e)))?;
    sink.send(Message::Text(json.into())).await
}
