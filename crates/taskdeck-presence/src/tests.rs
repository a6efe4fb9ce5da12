use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use taskdeck_common::StoreError;
use taskdeck_store::{
    CollectionRef, Document, DocumentRef, DocumentStore, Fields, MemoryStore, ScopedStore,
    Snapshot, Subscription,
};

use crate::*;

const WAIT: Duration = Duration::from_secs(2);

fn context(store: &MemoryStore) -> PresenceContext {
    PresenceContext::from_store(store.clone())
}

async fn viewer_ids(store: &MemoryStore, resource_id: &str) -> Vec<String> {
    store
        .list(&viewers_collection(resource_id).unwrap())
        .await
        .unwrap()
        .ids()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Wait until the tracker state satisfies `f`.
async fn state_until(tracker: &PresenceTracker, f: impl Fn(&PresenceState) -> bool) -> PresenceState {
    let mut rx = tracker.subscribe_state();
    let state = tokio::time::timeout(WAIT, rx.wait_for(|s| f(s)))
        .await
        .expect("state never matched")
        .expect("tracker state channel closed");
    state.clone()
}

/// Wait until the viewer stream yields a list satisfying `f`.
async fn viewers_until(
    stream: &mut ViewerStream,
    f: impl Fn(&[ViewerRecord]) -> bool,
) -> Vec<ViewerRecord> {
    tokio::time::timeout(WAIT, async {
        loop {
            let list = stream.next().await.expect("viewer stream ended");
            if f(&list) {
                return list;
            }
        }
    })
    .await
    .expect("viewer list never matched")
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_twice_leaves_one_record() {
    let store = MemoryStore::new();
    let ada = Principal::new("u1").with_display_name("Ada");

    join(&store, "t1", &ada).await.unwrap();
    join(&store, "t1", &ada).await.unwrap();

    assert_eq!(viewer_ids(&store, "t1").await, vec!["u1"]);
    assert_eq!(store.document_count().await, 1);
}

#[tokio::test]
async fn leave_without_record_is_a_no_op() {
    let store = MemoryStore::new();
    join(&store, "t2", &Principal::new("u2")).await.unwrap();

    leave(&store, "t1", "u1").await.unwrap();
    leave(&store, "t1", "u1").await.unwrap();

    assert_eq!(store.document_count().await, 1);
    assert_eq!(viewer_ids(&store, "t2").await, vec!["u2"]);
}

#[tokio::test]
async fn records_are_unique_per_resource_and_subject() {
    let store = MemoryStore::new();
    for task in ["t1", "t2"] {
        for subject in ["u1", "u2", "u1", "u2"] {
            join(&store, task, &Principal::new(subject)).await.unwrap();
        }
    }
    assert_eq!(viewer_ids(&store, "t1").await, vec!["u1", "u2"]);
    assert_eq!(viewer_ids(&store, "t2").await, vec!["u1", "u2"]);
    assert_eq!(store.document_count().await, 4);
}

#[tokio::test]
async fn subscriber_sees_join_then_leave() {
    let store = MemoryStore::new();
    let mut stream = subscribe(&store, "t1").await.unwrap();

    let initial = stream.next().await.unwrap();
    assert!(initial.is_empty());

    join(&store, "t1", &Principal::new("u1").with_avatar("https://img/u1.png"))
        .await
        .unwrap();
    let joined = viewers_until(&mut stream, |l| !l.is_empty()).await;
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].subject_id, "u1");
    assert_eq!(joined[0].resource_id, "t1");
    assert_eq!(joined[0].avatar_ref.as_deref(), Some("https://img/u1.png"));
    assert!(joined[0].joined_at.is_some());

    leave(&store, "t1", "u1").await.unwrap();
    let left = viewers_until(&mut stream, |l| l.iter().all(|v| v.subject_id != "u1")).await;
    assert!(left.is_empty());
}

#[tokio::test]
async fn subscription_ignores_other_resources() {
    let store = MemoryStore::new();
    join(&store, "t2", &Principal::new("u2")).await.unwrap();

    let mut stream = subscribe(&store, "t1").await.unwrap();
    assert!(stream.next().await.unwrap().is_empty());
    assert_eq!(stream.resource_id(), "t1");
}

#[tokio::test]
async fn spoofed_body_cannot_impersonate_another_viewer() {
    let store = MemoryStore::new();
    let mallory = ScopedStore::new(store.clone(), Some("u2".into()), Arc::new(write_policy()));
    let mut fields = Fields::new();
    fields.insert("subjectId".into(), "u1".into());
    fields.insert("displayName".into(), "Ada".into());
    mallory
        .set(&viewer_doc("t1", "u2").unwrap(), fields)
        .await
        .unwrap();
    join(&store, "t1", &Principal::new("u1")).await.unwrap();

    let mut stream = subscribe(&store, "t1").await.unwrap();
    let list = viewers_until(&mut stream, |l| l.len() == 2).await;
    let ids: Vec<&str> = list.iter().map(|v| v.subject_id.as_str()).collect();
    assert_eq!(ids, vec!["u1", "u2"]);
}

#[tokio::test]
async fn invalid_resource_id_is_rejected() {
    let store = MemoryStore::new();
    let err = join(&store, "a/b", &Principal::new("u1")).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidPath(_)));
    assert_eq!(store.document_count().await, 0);
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tracker_announces_and_lists_itself() {
    let store = MemoryStore::new();
    let tracker = PresenceTracker::open(
        context(&store),
        PresenceOptions::default(),
        "t1",
        Some(Principal::new("u1").with_display_name("Ada")),
    )
    .await;

    assert!(tracker.is_present());
    assert_eq!(tracker.resource_id(), Some("t1"));
    let state = state_until(&tracker, |s| !s.viewers.is_empty()).await;
    assert_eq!(state.viewer_ids(), vec!["u1"]);
    assert_eq!(state.viewers[0].display_name.as_deref(), Some("Ada"));

    tracker.shutdown().await;
    assert_eq!(store.document_count().await, 0);
}

#[tokio::test]
async fn tracker_sees_other_viewers_come_and_go() {
    let store = MemoryStore::new();
    let tracker = PresenceTracker::open(
        context(&store),
        PresenceOptions::default(),
        "t1",
        Some(Principal::new("u1")),
    )
    .await;

    join(&store, "t1", &Principal::new("u2")).await.unwrap();
    let state = state_until(&tracker, |s| s.viewers.len() == 2).await;
    assert_eq!(state.viewer_ids(), vec!["u1", "u2"]);

    leave(&store, "t1", "u2").await.unwrap();
    let state = state_until(&tracker, |s| s.viewers.len() == 1).await;
    assert_eq!(state.viewer_ids(), vec!["u1"]);

    tracker.shutdown().await;
}

#[tokio::test]
async fn switching_tasks_moves_the_record() {
    let store = MemoryStore::new();
    let me = Principal::new("u1");
    let mut tracker = PresenceTracker::new(context(&store), PresenceOptions::default());

    tracker.track(Some("t1"), Some(me.clone())).await;
    assert_eq!(viewer_ids(&store, "t1").await, vec!["u1"]);

    tracker.track(Some("t2"), Some(me.clone())).await;
    assert!(viewer_ids(&store, "t1").await.is_empty());
    assert_eq!(viewer_ids(&store, "t2").await, vec!["u1"]);
    assert_eq!(tracker.resource_id(), Some("t2"));

    let state = state_until(&tracker, |s| !s.viewers.is_empty()).await;
    assert!(state.viewers.iter().all(|v| v.resource_id == "t2"));

    tracker.shutdown().await;
    assert_eq!(store.document_count().await, 0);
}

#[tokio::test]
async fn old_task_updates_do_not_leak_after_switch() {
    let store = MemoryStore::new();
    let mut tracker = PresenceTracker::new(context(&store), PresenceOptions::default());

    tracker.track(Some("t1"), Some(Principal::new("u1"))).await;
    tracker.track(Some("t2"), Some(Principal::new("u1"))).await;
    state_until(&tracker, |s| s.viewer_ids() == vec!["u1"]).await;

    join(&store, "t1", &Principal::new("u9")).await.unwrap();
    join(&store, "t2", &Principal::new("u2")).await.unwrap();
    let state = state_until(&tracker, |s| s.viewers.len() == 2).await;
    assert_eq!(state.viewer_ids(), vec!["u1", "u2"]);
    assert!(state.viewers.iter().all(|v| v.resource_id == "t2"));

    tracker.shutdown().await;
}

#[tokio::test]
async fn two_sessions_for_one_subject_share_a_record() {
    let store = MemoryStore::new();
    let me = Principal::new("u1");
    let first =
        PresenceTracker::open(context(&store), PresenceOptions::default(), "t1", Some(me.clone()))
            .await;
    let second =
        PresenceTracker::open(context(&store), PresenceOptions::default(), "t1", Some(me)).await;

    assert_eq!(viewer_ids(&store, "t1").await, vec!["u1"]);
    let state = state_until(&second, |s| !s.viewers.is_empty()).await;
    assert_eq!(state.viewers.len(), 1);

    first.shutdown().await;
    second.shutdown().await;
}

#[tokio::test]
async fn unchanged_inputs_do_not_rewrite() {
    let store = MemoryStore::new();
    let me = Principal::new("u1");
    let mut tracker = PresenceTracker::new(context(&store), PresenceOptions::default());

    tracker.track(Some("t1"), Some(me.clone())).await;
    let doc = viewer_doc("t1", "u1").unwrap();
    let before = store.get(&doc).await.unwrap().unwrap().update_time;

    tokio::time::sleep(Duration::from_millis(5)).await;
    tracker.track(Some("t1"), Some(me)).await;
    let after = store.get(&doc).await.unwrap().unwrap().update_time;
    assert_eq!(before, after);

    tracker.shutdown().await;
}

#[tokio::test]
async fn anonymous_tracker_only_reads() {
    let store = MemoryStore::new();
    join(&store, "t1", &Principal::new("u2")).await.unwrap();

    let tracker =
        PresenceTracker::open(context(&store), PresenceOptions::default(), "t1", None).await;
    let state = state_until(&tracker, |s| !s.viewers.is_empty()).await;
    assert_eq!(state.viewer_ids(), vec!["u2"]);
    assert!(!state.is_present);
    assert_eq!(store.document_count().await, 1);

    tracker.shutdown().await;
    assert_eq!(viewer_ids(&store, "t1").await, vec!["u2"]);
}

#[tokio::test]
async fn announce_off_only_reads() {
    let store = MemoryStore::new();
    let options = PresenceOptions {
        announce: false,
        ..PresenceOptions::default()
    };
    let tracker =
        PresenceTracker::open(context(&store), options, "t1", Some(Principal::new("u1"))).await;
    assert!(!tracker.is_present());
    assert_eq!(store.document_count().await, 0);
    tracker.shutdown().await;
}

#[tokio::test]
async fn empty_resource_id_is_idle() {
    let store = MemoryStore::new();
    let mut tracker = PresenceTracker::new(context(&store), PresenceOptions::default());

    tracker.track(Some(""), Some(Principal::new("u1"))).await;
    assert_eq!(tracker.resource_id(), None);
    assert_eq!(tracker.state(), PresenceState::default());
    assert_eq!(store.document_count().await, 0);

    tracker.track(Some("t1"), Some(Principal::new("u1"))).await;
    tracker.track(None, Some(Principal::new("u1"))).await;
    assert_eq!(tracker.resource_id(), None);
    assert_eq!(tracker.state(), PresenceState::default());
    assert_eq!(store.document_count().await, 0);
}

#[tokio::test]
async fn include_self_off_hides_local_principal() {
    let store = MemoryStore::new();
    let options = PresenceOptions {
        include_self: false,
        ..PresenceOptions::default()
    };
    let tracker =
        PresenceTracker::open(context(&store), options, "t1", Some(Principal::new("u1"))).await;
    assert!(tracker.is_present());
    assert_eq!(viewer_ids(&store, "t1").await, vec!["u1"]);

    join(&store, "t1", &Principal::new("u2")).await.unwrap();
    let state = state_until(&tracker, |s| !s.viewers.is_empty()).await;
    assert_eq!(state.viewer_ids(), vec!["u2"]);

    tracker.shutdown().await;
}

#[tokio::test]
async fn denied_join_is_not_present() {
    let store = MemoryStore::new();
    // Store session authenticated as someone else.
    let scoped = ScopedStore::new(store.clone(), Some("u2".into()), Arc::new(write_policy()));
    let tracker = PresenceTracker::open(
        PresenceContext::from_store(scoped),
        PresenceOptions::default(),
        "t1",
        Some(Principal::new("u1")),
    )
    .await;

    assert!(!tracker.is_present());
    assert_eq!(store.document_count().await, 0);
    tracker.shutdown().await;
}

struct Offline;

#[async_trait]
impl DocumentStore for Offline {
    async fn set(&self, _: &DocumentRef, _: Fields) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }

    async fn delete(&self, _: &DocumentRef) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }

    async fn get(&self, _: &DocumentRef) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }

    async fn list(&self, _: &CollectionRef) -> Result<Snapshot, StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }

    async fn watch(&self, _: &CollectionRef) -> Result<Subscription, StoreError> {
        Err(StoreError::Unavailable("offline".into()))
    }
}

#[tokio::test]
async fn store_failures_are_swallowed() {
    let mut tracker = PresenceTracker::new(
        PresenceContext::from_store(Offline),
        PresenceOptions::default(),
    );
    tracker.track(Some("t1"), Some(Principal::new("u1"))).await;
    assert_eq!(tracker.resource_id(), Some("t1"));
    assert_eq!(tracker.state(), PresenceState::default());

    tracker.track(Some("t2"), Some(Principal::new("u1"))).await;
    tracker.shutdown().await;
}

#[tokio::test]
async fn dropped_tracker_still_leaves() {
    let store = MemoryStore::new();
    let tracker = PresenceTracker::open(
        context(&store),
        PresenceOptions::default(),
        "t1",
        Some(Principal::new("u1")),
    )
    .await;
    assert_eq!(store.document_count().await, 1);

    drop(tracker);
    tokio::time::timeout(WAIT, async {
        while store.document_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("record was never removed");
}
