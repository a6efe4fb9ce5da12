//! Background WebSocket connection loop with auto-reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use taskdeck_common::StoreError;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::handler::handle_server_frame;
use super::types::{Command, RemoteConfig, Shared};
use crate::protocol::{ClientFrame, ServerFrame};

/// Serialize and send one frame. Returns `false` if the socket is gone.
async fn send_frame<S>(ws_write: &Mutex<S>, frame: &ClientFrame) -> bool
where
    S: Sink<WsMessage> + Unpin,
{
    let Ok(json) = serde_json::to_string(frame) else {
        return false;
    };
    let mut writer = ws_write.lock().await;
    writer.send(WsMessage::Text(json.into())).await.is_ok()
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Doubles the delay after a failed attempt, capped at `max`.
fn next_reconnect_delay(current: u64, max: u64) -> u64 {
    current.saturating_mul(2).min(max)
}

/// Background task managing the WebSocket connection with auto-reconnect.
///
/// Exits after `disconnect()`, or once every `RemoteStore` handle is dropped.
pub(crate) async fn connection_loop(
    config: RemoteConfig,
    shared: Arc<Shared>,
    command_rx: mpsc::Receiver<Command>,
) {
    let command_rx = Arc::new(Mutex::new(command_rx));
    let mut reconnect_delay = config.reconnect_delay_secs;

    loop {
        if shared.is_shutdown() || Arc::strong_count(&shared) == 1 {
            break;
        }

        info!(url = %config.url, "Connecting to store server");
        match tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            tokio_tungstenite::connect_async(config.url.as_str()),
        )
        .await
        {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = config.reconnect_delay_secs;
                run_session(ws_stream, &config, &shared, &command_rx).await;
                shared.connected.send_replace(false);
                shared.fail_pending("connection lost").await;
                drain_commands(&command_rx, &shared, "connection lost").await;
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to store server");
            }
            Err(_elapsed) => {
                error!(
                    "WebSocket connection timed out after {}s",
                    config.connect_timeout_secs
                );
            }
        }

        if shared.is_shutdown() {
            break;
        }

        info!(delay = reconnect_delay, "Reconnecting in {} seconds", reconnect_delay);
        tokio::time::sleep(Duration::from_secs(reconnect_delay)).await;
        reconnect_delay = next_reconnect_delay(reconnect_delay, config.max_reconnect_delay_secs);
    }

    shared.connected.send_replace(false);
    shared.fail_pending("store disconnected").await;
    // Dropping the senders ends every live query.
    shared.watches.lock().await.clear();
    debug!("Connection loop exited");
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Drive one established connection until it closes.
async fn run_session<T>(
    ws_stream: tokio_tungstenite::WebSocketStream<T>,
    config: &RemoteConfig,
    shared: &Arc<Shared>,
    command_rx: &Arc<Mutex<mpsc::Receiver<Command>>>,
) where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (ws_write, mut ws_read) = ws_stream.split();
    let ws_write = Arc::new(Mutex::new(ws_write));

    let hello = ClientFrame::Hello {
        subject_id: config.subject_id.clone(),
    };
    if !send_frame(&ws_write, &hello).await {
        warn!("Failed to send hello");
        return;
    }

    // Re-register live queries that outlived the previous connection.
    {
        let watches = shared.watches.lock().await;
        for collection in watches.keys() {
            let frame = ClientFrame::Watch {
                collection: collection.to_string(),
            };
            send_frame(&ws_write, &frame).await;
        }
    }

    let heartbeat_handle = tokio::spawn(heartbeat_task(
        Arc::clone(&ws_write),
        config.heartbeat_interval_secs,
    ));
    let cmd_handle = tokio::spawn(command_forwarder(
        Arc::clone(command_rx),
        Arc::clone(&ws_write),
        Arc::clone(shared),
    ));

    while let Some(msg_result) = ws_read.next().await {
        match msg_result {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerFrame>(text.as_str()) {
                Ok(frame) => handle_server_frame(frame, shared).await,
                Err(e) => {
                    debug!(error = %e, text = %text.as_str(), "Unrecognized frame from server");
                }
            },
            Ok(WsMessage::Close(_)) => {
                info!("Store server closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    heartbeat_handle.abort();
    cmd_handle.abort();
    // Release the command receiver before the caller drains it.
    let _ = cmd_handle.await;
}

/// Settle commands queued while no session was forwarding them, so stale
/// requests fail now instead of replaying on the next session.
pub(crate) async fn drain_commands(
    command_rx: &Mutex<mpsc::Receiver<Command>>,
    shared: &Shared,
    reason: &str,
) {
    let mut rx = command_rx.lock().await;
    while let Ok(cmd) = rx.try_recv() {
        match cmd {
            Command::Request { frame, reply } => {
                debug!(req_ref = ?frame.req_ref(), "Failing queued request");
                let _ = reply.send(Err(StoreError::Unavailable(reason.to_string())));
            }
            // Re-sent from `shared.watches` by the next session.
            Command::Watch { .. } => {}
            Command::Unwatch { collection } => {
                let mut watches = shared.watches.lock().await;
                if watches
                    .get(&collection)
                    .is_some_and(|tx| tx.receiver_count() == 0)
                {
                    watches.remove(&collection);
                }
            }
            Command::Shutdown => shared.request_shutdown(),
        }
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

async fn heartbeat_task<S>(ws_write: Arc<Mutex<S>>, interval_secs: u64)
where
    S: Sink<WsMessage> + Unpin,
{
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        if !send_frame(&ws_write, &ClientFrame::Heartbeat).await {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Command Forwarder
// ---------------------------------------------------------------------------

async fn command_forwarder<S>(
    cmd_rx: Arc<Mutex<mpsc::Receiver<Command>>>,
    cmd_write: Arc<Mutex<S>>,
    shared: Arc<Shared>,
) where
    S: Sink<WsMessage> + Unpin,
{
    let mut rx = cmd_rx.lock().await;
    loop {
        let Some(cmd) = rx.recv().await else {
            // Every handle is gone.
            shared.request_shutdown();
            let mut writer = cmd_write.lock().await;
            let _ = writer.send(WsMessage::Close(None)).await;
            return;
        };

        match cmd {
            Command::Request { frame, reply } => {
                if reply.is_closed() {
                    debug!(req_ref = ?frame.req_ref(), "Dropping request abandoned by its caller");
                    continue;
                }
                let req_ref = frame.req_ref().unwrap_or_default().to_string();
                shared.pending.lock().await.insert(req_ref.clone(), reply);
                if !send_frame(&cmd_write, &frame).await {
                    if let Some(reply) = shared.pending.lock().await.remove(&req_ref) {
                        let _ = reply.send(Err(StoreError::Unavailable(
                            "failed to send request".into(),
                        )));
                    }
                }
            }
            Command::Watch { collection } => {
                let frame = ClientFrame::Watch {
                    collection: collection.to_string(),
                };
                send_frame(&cmd_write, &frame).await;
            }
            Command::Unwatch { collection } => {
                let mut watches = shared.watches.lock().await;
                let idle = watches
                    .get(&collection)
                    .is_some_and(|tx| tx.receiver_count() == 0);
                if idle {
                    watches.remove(&collection);
                    drop(watches);
                    let frame = ClientFrame::Unwatch {
                        collection: collection.to_string(),
                    };
                    send_frame(&cmd_write, &frame).await;
                }
            }
            Command::Shutdown => {
                let mut writer = cmd_write.lock().await;
                let _ = writer.send(WsMessage::Close(None)).await;
                return;
            }
        }
    }
}
