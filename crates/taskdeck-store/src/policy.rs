//! Write authorization for shared collections.

use std::sync::Arc;

use async_trait::async_trait;
use taskdeck_common::StoreError;

use crate::document::{Document, Fields, Snapshot};
use crate::path::{CollectionRef, DocumentRef};
use crate::store::DocumentStore;
use crate::subscription::Subscription;

/// A mutating store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Set,
    Delete,
}

/// Decides whether a principal may mutate a document.
pub trait AccessPolicy: Send + Sync {
    fn check_write(
        &self,
        subject: Option<&str>,
        op: Operation,
        doc: &DocumentRef,
    ) -> Result<(), StoreError>;
}

/// Permits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn check_write(&self, _: Option<&str>, _: Operation, _: &DocumentRef) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Restricts `{root}/{any}/{leaf}/{id}` documents to the principal whose
/// subject id equals `id`. Other paths are unrestricted.
#[derive(Debug, Clone)]
pub struct OwnRecordOnly {
    root: String,
    leaf: String,
}

impl OwnRecordOnly {
    pub fn new(root: impl Into<String>, leaf: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            leaf: leaf.into(),
        }
    }

    fn governs(&self, doc: &DocumentRef) -> bool {
        let segments: Vec<&str> = doc.collection().segments().collect();
        segments.len() == 3 && segments[0] == self.root && segments[2] == self.leaf
    }
}

impl AccessPolicy for OwnRecordOnly {
    fn check_write(
        &self,
        subject: Option<&str>,
        op: Operation,
        doc: &DocumentRef,
    ) -> Result<(), StoreError> {
        if !self.governs(doc) {
            return Ok(());
        }
        match subject {
            Some(subject) if subject == doc.id() => Ok(()),
            Some(subject) => Err(StoreError::PermissionDenied(format!(
                "{subject} may not {op:?} {doc}"
            ))),
            None => Err(StoreError::PermissionDenied(format!(
                "anonymous clients may not {op:?} {doc}"
            ))),
        }
    }
}

/// A store view bound to one principal, enforcing a policy on every write.
#[derive(Clone)]
pub struct ScopedStore<S> {
    inner: S,
    subject: Option<String>,
    policy: Arc<dyn AccessPolicy>,
}

impl<S: DocumentStore> ScopedStore<S> {
    pub fn new(inner: S, subject: Option<String>, policy: Arc<dyn AccessPolicy>) -> Self {
        Self {
            inner,
            subject,
            policy,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for ScopedStore<S> {
    async fn set(&self, doc: &DocumentRef, fields: Fields) -> Result<(), StoreError> {
        self.policy
            .check_write(self.subject.as_deref(), Operation::Set, doc)?;
        self.inner.set(doc, fields).await
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<(), StoreError> {
        self.policy
            .check_write(self.subject.as_deref(), Operation::Delete, doc)?;
        self.inner.delete(doc).await
    }

    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, StoreError> {
        self.inner.get(doc).await
    }

    async fn list(&self, collection: &CollectionRef) -> Result<Snapshot, StoreError> {
        self.inner.list(collection).await
    }

    async fn watch(&self, collection: &CollectionRef) -> Result<Subscription, StoreError> {
        self.inner.watch(collection).await
    }
}
