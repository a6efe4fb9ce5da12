//! Incoming server frame handling.

use taskdeck_common::StoreError;
use tracing::{debug, info, warn};

use super::types::{Reply, Shared};
use crate::path::CollectionRef;
use crate::protocol::ServerFrame;

async fn resolve(shared: &Shared, req_ref: &str, result: Result<Reply, StoreError>) {
    match shared.pending.lock().await.remove(req_ref) {
        Some(reply) => {
            let _ = reply.send(result);
        }
        None => debug!(req_ref = %req_ref, "Reply for unknown or expired request"),
    }
}

/// Handle a single frame from the server.
pub(crate) async fn handle_server_frame(frame: ServerFrame, shared: &Shared) {
    match frame {
        ServerFrame::Ready { connection_id } => {
            info!(connection_id = %connection_id, "Store session ready");
            shared.connected.send_replace(true);
        }
        ServerFrame::Ack { req_ref } => resolve(shared, &req_ref, Ok(Reply::Ack)).await,
        ServerFrame::Document { req_ref, document } => {
            resolve(shared, &req_ref, Ok(Reply::Document(document))).await;
        }
        ServerFrame::Snapshot {
            collection,
            req_ref: Some(req_ref),
            documents,
        } => {
            let result = ServerFrame::parse_snapshot(&collection, documents).map(Reply::Snapshot);
            resolve(shared, &req_ref, result).await;
        }
        ServerFrame::Snapshot {
            collection,
            req_ref: None,
            documents,
        } => {
            let collection = match CollectionRef::parse(&collection) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "Live snapshot for invalid collection");
                    return;
                }
            };
            debug!(collection = %collection, documents = documents.len(), "Live snapshot received");
            let watches = shared.watches.lock().await;
            if let Some(tx) = watches.get(&collection) {
                let snapshot = ServerFrame::parse_snapshot(collection.as_str(), documents);
                if let Ok(snapshot) = snapshot {
                    tx.send_replace(Some(snapshot));
                }
            }
        }
        ServerFrame::Error {
            req_ref: Some(req_ref),
            code,
            message,
        } => {
            resolve(shared, &req_ref, Err(StoreError::from_code(&code, message))).await;
        }
        ServerFrame::Error {
            req_ref: None,
            code,
            message,
        } => {
            warn!(code = %code, message = %message, "Store server reported an error");
        }
    }
}
