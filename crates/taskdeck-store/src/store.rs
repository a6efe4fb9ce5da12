//! The document store interface every backend implements.

use std::sync::Arc;

use async_trait::async_trait;
use taskdeck_common::StoreError;

use crate::document::{Document, Fields, Snapshot};
use crate::path::{CollectionRef, DocumentRef};
use crate::subscription::Subscription;

/// A reactive document store.
///
/// Writes are single-document and last-write-wins; no transactions or
/// version checks are offered.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or fully overwrite a document. Server timestamp sentinels in
    /// `fields` are resolved to the commit time.
    async fn set(&self, doc: &DocumentRef, fields: Fields) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, doc: &DocumentRef) -> Result<(), StoreError>;

    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, StoreError>;

    async fn list(&self, collection: &CollectionRef) -> Result<Snapshot, StoreError>;

    /// Open a live query over a collection.
    async fn watch(&self, collection: &CollectionRef) -> Result<Subscription, StoreError>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn set(&self, doc: &DocumentRef, fields: Fields) -> Result<(), StoreError> {
        (**self).set(doc, fields).await
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<(), StoreError> {
        (**self).delete(doc).await
    }

    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, StoreError> {
        (**self).get(doc).await
    }

    async fn list(&self, collection: &CollectionRef) -> Result<Snapshot, StoreError> {
        (**self).list(collection).await
    }

    async fn watch(&self, collection: &CollectionRef) -> Result<Subscription, StoreError> {
        (**self).watch(collection).await
    }
}
