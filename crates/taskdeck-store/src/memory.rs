//! In-process reactive document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use taskdeck_common::StoreError;
use tokio::sync::{watch, RwLock};
use tracing::trace;

use crate::document::{resolve_server_timestamps, Document, Fields, Snapshot};
use crate::path::{CollectionRef, DocumentRef};
use crate::store::DocumentStore;
use crate::subscription::Subscription;

#[derive(Default)]
struct Inner {
    collections: HashMap<CollectionRef, BTreeMap<String, Document>>,
    watchers: HashMap<CollectionRef, watch::Sender<Option<Snapshot>>>,
}

impl Inner {
    fn snapshot(&self, collection: &CollectionRef) -> Snapshot {
        let documents = self
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        Snapshot {
            collection: collection.clone(),
            documents,
        }
    }

    /// Push the current snapshot to live queries on `collection`.
    fn notify(&mut self, collection: &CollectionRef) {
        let Some(tx) = self.watchers.get(collection) else {
            return;
        };
        if tx.receiver_count() == 0 {
            self.watchers.remove(collection);
            return;
        }
        let snapshot = self.snapshot(collection);
        trace!(collection = %collection, documents = snapshot.len(), "Notifying watchers");
        if let Some(tx) = self.watchers.get(collection) {
            tx.send_replace(Some(snapshot));
        }
    }
}

/// Thread-safe in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn watcher_count(&self) -> usize {
        self.inner.read().await.watchers.len()
    }

    /// Number of documents across all collections.
    pub async fn document_count(&self) -> usize {
        self.inner
            .read()
            .await
            .collections
            .values()
            .map(BTreeMap::len)
            .sum()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn set(&self, doc: &DocumentRef, mut fields: Fields) -> Result<(), StoreError> {
        let now = Utc::now();
        resolve_server_timestamps(&mut fields, now);

        let mut inner = self.inner.write().await;
        inner
            .collections
            .entry(doc.collection().clone())
            .or_default()
            .insert(
                doc.id().to_string(),
                Document {
                    id: doc.id().to_string(),
                    fields,
                    update_time: now,
                },
            );
        inner.notify(doc.collection());
        Ok(())
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let Some(docs) = inner.collections.get_mut(doc.collection()) else {
            return Ok(());
        };
        if docs.remove(doc.id()).is_none() {
            return Ok(());
        }
        if docs.is_empty() {
            inner.collections.remove(doc.collection());
        }
        inner.notify(doc.collection());
        Ok(())
    }

    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(doc.collection())
            .and_then(|docs| docs.get(doc.id()))
            .cloned())
    }

    async fn list(&self, collection: &CollectionRef) -> Result<Snapshot, StoreError> {
        Ok(self.inner.read().await.snapshot(collection))
    }

    async fn watch(&self, collection: &CollectionRef) -> Result<Subscription, StoreError> {
        let mut inner = self.inner.write().await;
        inner.watchers.retain(|_, tx| tx.receiver_count() > 0);
        let rx = match inner.watchers.get(collection) {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = watch::channel(Some(inner.snapshot(collection)));
                inner.watchers.insert(collection.clone(), tx);
                rx
            }
        };
        Ok(Subscription::new(collection.clone(), rx))
    }
}
