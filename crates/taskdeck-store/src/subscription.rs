//! Live query handle.

use std::any::Any;
use std::fmt;

use futures_util::Stream;
use tokio::sync::watch;

use crate::document::Snapshot;
use crate::path::CollectionRef;

/// A standing read over one collection.
///
/// Yields the current snapshot first, then a fresh snapshot after every
/// change. Snapshots that arrive faster than they are consumed coalesce into
/// the latest one. Dropping the subscription cancels it; the sequence ends
/// when the store behind it goes away.
pub struct Subscription {
    collection: CollectionRef,
    // Dropped before `_guard`, so the guard sees the final receiver count.
    rx: watch::Receiver<Option<Snapshot>>,
    primed: bool,
    _guard: Option<Box<dyn Any + Send + Sync>>,
}

impl Subscription {
    pub fn new(collection: CollectionRef, rx: watch::Receiver<Option<Snapshot>>) -> Self {
        Self {
            collection,
            rx,
            primed: false,
            _guard: None,
        }
    }

    /// Attach a value that is dropped together with the subscription.
    pub fn with_guard<G: Any + Send + Sync>(mut self, guard: G) -> Self {
        self._guard = Some(Box::new(guard));
        self
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    /// Wait for the next snapshot. `None` means the sequence has ended.
    pub async fn next(&mut self) -> Option<Snapshot> {
        loop {
            if self.primed {
                self.rx.changed().await.ok()?;
            } else {
                self.primed = true;
            }
            if let Some(snapshot) = self.rx.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Snapshot> + Send + 'static {
        futures_util::stream::unfold(self, |mut sub| async move {
            let snapshot = sub.next().await?;
            Some((snapshot, sub))
        })
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("primed", &self.primed)
            .finish()
    }
}
