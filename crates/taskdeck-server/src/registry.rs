//! Writer registry: remembers which connection last wrote each document, so
//! a connection's records can be removed when it drops.

use std::collections::HashMap;
use std::sync::Arc;

use taskdeck_common::{ConnectionId, StoreError};
use taskdeck_store::{DocumentRef, DocumentStore, Fields};
use tokio::sync::Mutex;

/// Thread-safe map from document to its last writer.
///
/// Writes routed through the registry are serialized with each other and
/// with reaping, so a document rewritten by another connection is never
/// reaped on behalf of the previous writer.
#[derive(Clone, Default)]
pub struct WriterRegistry {
    owners: Arc<Mutex<HashMap<DocumentRef, ConnectionId>>>,
}

impl WriterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `doc` through `store` and record `writer` as its owner.
    pub async fn set(
        &self,
        store: &dyn DocumentStore,
        doc: &DocumentRef,
        fields: Fields,
        writer: &ConnectionId,
    ) -> Result<(), StoreError> {
        let mut owners = self.owners.lock().await;
        store.set(doc, fields).await?;
        owners.insert(doc.clone(), writer.clone());
        Ok(())
    }

    /// Delete `doc` through `store` and forget its owner.
    pub async fn delete(&self, store: &dyn DocumentStore, doc: &DocumentRef) -> Result<(), StoreError> {
        let mut owners = self.owners.lock().await;
        store.delete(doc).await?;
        owners.remove(doc);
        Ok(())
    }

    /// Delete every document whose last writer is `writer`. Returns the
    /// number of documents removed.
    pub async fn reap(&self, store: &dyn DocumentStore, writer: &ConnectionId) -> usize {
        let mut owners = self.owners.lock().await;
        let owned: Vec<DocumentRef> = owners
            .iter()
            .filter(|(_, owner)| *owner == writer)
            .map(|(doc, _)| doc.clone())
            .collect();

        let mut removed = 0;
        for doc in owned {
            owners.remove(&doc);
            match store.delete(&doc).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(doc = %doc, error = %e, "Failed to reap document");
                }
            }
        }
        removed
    }

    /// Number of documents with a known writer.
    pub async fn len(&self) -> usize {
        self.owners.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.owners.lock().await.is_empty()
    }
}
