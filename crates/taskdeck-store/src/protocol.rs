//! Wire protocol between `RemoteStore` and `taskdeck-server`.
//!
//! Every frame is a JSON text message tagged by `type`. Requests that expect
//! an answer carry a client-chosen `ref`, echoed on the reply.

use serde::{Deserialize, Serialize};
use taskdeck_common::StoreError;

use crate::document::{Document, Fields, Snapshot};
use crate::path::CollectionRef;

/// Frames sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Must be the first frame on a connection.
    Hello {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject_id: Option<String>,
    },
    Set {
        #[serde(rename = "ref")]
        req_ref: String,
        path: String,
        fields: Fields,
    },
    Delete {
        #[serde(rename = "ref")]
        req_ref: String,
        path: String,
    },
    Get {
        #[serde(rename = "ref")]
        req_ref: String,
        path: String,
    },
    List {
        #[serde(rename = "ref")]
        req_ref: String,
        collection: String,
    },
    Watch {
        collection: String,
    },
    Unwatch {
        collection: String,
    },
    Heartbeat,
}

impl ClientFrame {
    /// The request ref, for frames that expect a reply.
    pub fn req_ref(&self) -> Option<&str> {
        match self {
            ClientFrame::Set { req_ref, .. }
            | ClientFrame::Delete { req_ref, .. }
            | ClientFrame::Get { req_ref, .. }
            | ClientFrame::List { req_ref, .. } => Some(req_ref),
            _ => None,
        }
    }
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Ready {
        connection_id: String,
    },
    Ack {
        #[serde(rename = "ref")]
        req_ref: String,
    },
    Document {
        #[serde(rename = "ref")]
        req_ref: String,
        document: Option<Document>,
    },
    /// Reply to `list` when `ref` is set; otherwise a live-query update.
    Snapshot {
        collection: String,
        #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
        req_ref: Option<String>,
        documents: Vec<Document>,
    },
    Error {
        #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
        req_ref: Option<String>,
        code: String,
        message: String,
    },
}

impl ServerFrame {
    pub fn error(req_ref: Option<String>, err: &StoreError) -> Self {
        ServerFrame::Error {
            req_ref,
            code: err.code().to_string(),
            message: err.message().to_string(),
        }
    }

    pub fn snapshot(snapshot: Snapshot, req_ref: Option<String>) -> Self {
        ServerFrame::Snapshot {
            collection: snapshot.collection.to_string(),
            req_ref,
            documents: snapshot.documents,
        }
    }

    /// Rebuild a typed snapshot from a `snapshot` frame's parts.
    pub fn parse_snapshot(collection: &str, documents: Vec<Document>) -> Result<Snapshot, StoreError> {
        Ok(Snapshot {
            collection: CollectionRef::parse(collection)?,
            documents,
        })
    }
}
