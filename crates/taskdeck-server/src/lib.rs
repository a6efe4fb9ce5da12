//! taskdeck-server: WebSocket front end for a shared in-memory document store.
//!
//! Clients send a hello naming their subject, then issue document requests
//! and open live queries. Every write goes through the server's access
//! policy, so a client can only create or delete its own viewer records.

pub mod connection;
pub mod registry;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use taskdeck_config::ServerConfig;
use taskdeck_store::{AccessPolicy, MemoryStore};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use crate::connection::handle_connection;
use crate::registry::WriterRegistry;

/// Per-server behavior switches.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub reap_on_disconnect: bool,
    pub hello_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            reap_on_disconnect: false,
            hello_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ServerConfig> for ServerOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            reap_on_disconnect: config.reap_on_disconnect,
            hello_timeout: Duration::from_secs(u64::from(config.hello_timeout)),
        }
    }
}

/// State shared by every connection.
#[derive(Clone)]
pub struct ServerState {
    pub store: MemoryStore,
    pub policy: Arc<dyn AccessPolicy>,
    pub writers: WriterRegistry,
    pub options: ServerOptions,
}

impl ServerState {
    /// A fresh store guarded by the presence write policy.
    pub fn new(options: ServerOptions) -> Self {
        Self {
            store: MemoryStore::new(),
            policy: Arc::new(taskdeck_presence::write_policy()),
            writers: WriterRegistry::new(),
            options,
        }
    }
}

/// Accept connections on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: ServerState, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down store server");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => spawn_connection(stream, addr, state.clone()),
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            },
        }
    }
}

fn spawn_connection(stream: tokio::net::TcpStream, addr: SocketAddr, state: ServerState) {
    tokio::spawn(async move {
        match accept_async(stream).await {
            Ok(ws) => handle_connection(ws, addr, state).await,
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
            }
        }
    });
}
