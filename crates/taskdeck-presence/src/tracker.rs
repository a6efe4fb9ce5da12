//! Per-view presence tracker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use taskdeck_store::DocumentStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ops::{self, ViewerStream};
use crate::types::{PresenceOptions, PresenceState, Principal};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Session-scoped handles the tracker needs, built once by the application
/// and passed in explicitly.
#[derive(Clone)]
pub struct PresenceContext {
    store: Arc<dyn DocumentStore>,
}

impl PresenceContext {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn from_store<S: DocumentStore + 'static>(store: S) -> Self {
        Self::new(Arc::new(store))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// The view the tracker is currently attached to.
struct Mount {
    resource_id: String,
    principal: Option<Principal>,
    listener: Option<JoinHandle<()>>,
}

/// Keeps the local principal's viewer record in step with the task view it
/// has open, and exposes the task's live viewer list.
///
/// Call [`track`](Self::track) whenever the open task or the signed-in
/// principal changes, and [`shutdown`](Self::shutdown) when the view closes.
/// A tracker dropped without `shutdown` still schedules a best-effort leave
/// on the current Tokio runtime.
pub struct PresenceTracker {
    context: PresenceContext,
    options: PresenceOptions,
    state_tx: watch::Sender<PresenceState>,
    /// Bumped on every teardown; listeners from older mounts stop publishing.
    generation: Arc<AtomicU64>,
    mounted: Option<Mount>,
}

impl PresenceTracker {
    pub fn new(context: PresenceContext, options: PresenceOptions) -> Self {
        Self {
            context,
            options,
            state_tx: watch::channel(PresenceState::default()).0,
            generation: Arc::new(AtomicU64::new(0)),
            mounted: None,
        }
    }

    /// Create a tracker and attach it in one step.
    pub async fn open(
        context: PresenceContext,
        options: PresenceOptions,
        resource_id: &str,
        principal: Option<Principal>,
    ) -> Self {
        let mut tracker = Self::new(context, options);
        tracker.track(Some(resource_id), principal).await;
        tracker
    }

    /// Attach to `resource_id` as `principal`.
    ///
    /// Unchanged inputs are a no-op. Otherwise the previous view is torn
    /// down first (live query cancelled, previous record deleted), then the
    /// new one is mounted. An empty or absent `resource_id` leaves the
    /// tracker idle; an absent `principal` subscribes without writing.
    pub async fn track(&mut self, resource_id: Option<&str>, principal: Option<Principal>) {
        let resource_id = resource_id.filter(|r| !r.is_empty());

        match &self.mounted {
            Some(m) if Some(m.resource_id.as_str()) == resource_id && m.principal == principal => {
                return;
            }
            None if resource_id.is_none() => return,
            _ => {}
        }

        self.teardown().await;
        if let Some(resource_id) = resource_id {
            self.mount(resource_id, principal).await;
        }
    }

    /// Tear down the current view and release the local viewer record.
    pub async fn shutdown(mut self) {
        self.teardown().await;
    }

    pub fn state(&self) -> PresenceState {
        self.state_tx.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<PresenceState> {
        self.state_tx.subscribe()
    }

    pub fn is_present(&self) -> bool {
        self.state_tx.borrow().is_present
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.mounted.as_ref().map(|m| m.resource_id.as_str())
    }

    fn announcing<'a>(&self, principal: &'a Option<Principal>) -> Option<&'a Principal> {
        principal.as_ref().filter(|_| self.options.announce)
    }

    async fn mount(&mut self, resource_id: &str, principal: Option<Principal>) {
        let store = Arc::clone(&self.context.store);
        let generation = self.generation.load(Ordering::SeqCst);
        debug!(resource = %resource_id, subject = ?principal.as_ref().map(|p| &p.subject_id), "Mounting presence");

        let listener = match ops::subscribe(store.as_ref(), resource_id).await {
            Ok(viewers) => {
                let hidden = principal
                    .as_ref()
                    .filter(|_| !self.options.include_self)
                    .map(|p| p.subject_id.clone());
                Some(tokio::spawn(publish_viewers(
                    viewers,
                    self.state_tx.clone(),
                    Arc::clone(&self.generation),
                    generation,
                    hidden,
                )))
            }
            Err(e) => {
                warn!(resource = %resource_id, error = %e, "Failed to subscribe to viewers");
                None
            }
        };

        if let Some(p) = self.announcing(&principal) {
            match ops::join(store.as_ref(), resource_id, p).await {
                Ok(()) => {
                    let current = Arc::clone(&self.generation);
                    self.state_tx.send_if_modified(|state| {
                        if current.load(Ordering::SeqCst) != generation || state.is_present {
                            return false;
                        }
                        state.is_present = true;
                        true
                    });
                }
                Err(e) => {
                    warn!(resource = %resource_id, subject = %p.subject_id, error = %e, "Failed to join presence");
                }
            }
        }

        self.mounted = Some(Mount {
            resource_id: resource_id.to_string(),
            principal,
            listener,
        });
    }

    async fn teardown(&mut self) {
        let Some(mount) = self.mounted.take() else {
            return;
        };
        debug!(resource = %mount.resource_id, "Tearing down presence");

        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(listener) = mount.listener {
            listener.abort();
        }
        self.state_tx.send_replace(PresenceState::default());

        if let Some(p) = self.announcing(&mount.principal) {
            let store = self.context.store.as_ref();
            if let Err(e) = ops::leave(store, &mount.resource_id, &p.subject_id).await {
                warn!(resource = %mount.resource_id, subject = %p.subject_id, error = %e, "Failed to leave presence");
            }
        }
    }
}

impl Drop for PresenceTracker {
    fn drop(&mut self) {
        let Some(mount) = self.mounted.take() else {
            return;
        };
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(listener) = mount.listener {
            listener.abort();
        }
        let Some(principal) = mount.principal.filter(|_| self.options.announce) else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.context.store);
                let resource_id = mount.resource_id;
                handle.spawn(async move {
                    if let Err(e) =
                        ops::leave(store.as_ref(), &resource_id, &principal.subject_id).await
                    {
                        warn!(resource = %resource_id, error = %e, "Best-effort leave failed");
                    }
                });
            }
            Err(_) => {
                warn!(
                    resource = %mount.resource_id,
                    subject = %principal.subject_id,
                    "Tracker dropped outside a runtime; viewer record left behind"
                );
            }
        }
    }
}

/// Forward viewer lists into the tracker state until the mount is replaced.
async fn publish_viewers(
    mut viewers: ViewerStream,
    state_tx: watch::Sender<PresenceState>,
    generation: Arc<AtomicU64>,
    mine: u64,
    hidden: Option<String>,
) {
    while let Some(mut list) = viewers.next().await {
        if let Some(subject) = &hidden {
            list.retain(|v| &v.subject_id != subject);
        }
        state_tx.send_if_modified(|state| {
            if generation.load(Ordering::SeqCst) != mine || state.viewers == list {
                return false;
            }
            state.viewers = list;
            true
        });
        if generation.load(Ordering::SeqCst) != mine {
            break;
        }
    }
    debug!(resource = %viewers.resource_id(), "Viewer stream ended");
}
