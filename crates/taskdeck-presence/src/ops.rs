//! The three presence operations against a document store.

use futures_util::Stream;
use taskdeck_common::StoreError;
use taskdeck_store::{DocumentStore, Snapshot, Subscription};
use tracing::debug;

use crate::paths::{viewer_doc, viewers_collection};
use crate::types::{Principal, ViewerRecord};

/// Live sequence of a task's viewer lists.
#[derive(Debug)]
pub struct ViewerStream {
    resource_id: String,
    subscription: Subscription,
}

impl ViewerStream {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Wait for the next viewer list. `None` once the live query has ended.
    pub async fn next(&mut self) -> Option<Vec<ViewerRecord>> {
        let snapshot = self.subscription.next().await?;
        Some(decode_viewers(&self.resource_id, &snapshot))
    }

    pub fn into_stream(self) -> impl Stream<Item = Vec<ViewerRecord>> + Send + 'static {
        futures_util::stream::unfold(self, |mut viewers| async move {
            let list = viewers.next().await?;
            Some((list, viewers))
        })
    }
}

fn decode_viewers(resource_id: &str, snapshot: &Snapshot) -> Vec<ViewerRecord> {
    snapshot
        .documents
        .iter()
        .filter_map(|doc| ViewerRecord::from_document(resource_id, doc))
        .collect()
}

/// Open a live query over `resource_id`'s viewer records.
pub async fn subscribe(
    store: &dyn DocumentStore,
    resource_id: &str,
) -> Result<ViewerStream, StoreError> {
    let collection = viewers_collection(resource_id)?;
    let subscription = store.watch(&collection).await?;
    debug!(resource = %resource_id, "Subscribed to viewers");
    Ok(ViewerStream {
        resource_id: resource_id.to_string(),
        subscription,
    })
}

/// Write `principal`'s viewer record for `resource_id`, overwriting any
/// previous one. The join time is assigned by the store.
pub async fn join(
    store: &dyn DocumentStore,
    resource_id: &str,
    principal: &Principal,
) -> Result<(), StoreError> {
    let doc = viewer_doc(resource_id, &principal.subject_id)?;
    store
        .set(&doc, ViewerRecord::join_fields(resource_id, principal))
        .await?;
    debug!(resource = %resource_id, subject = %principal.subject_id, "Joined");
    Ok(())
}

/// Delete `subject_id`'s viewer record for `resource_id`. A missing record is fine.
pub async fn leave(
    store: &dyn DocumentStore,
    resource_id: &str,
    subject_id: &str,
) -> Result<(), StoreError> {
    let doc = viewer_doc(resource_id, subject_id)?;
    store.delete(&doc).await?;
    debug!(resource = %resource_id, subject = %subject_id, "Left");
    Ok(())
}
