//! Reactive document store boundary.
//!
//! Documents live in slash-separated collections
//! (`presence/{task}/users/{subject}`). A store supports whole-document
//! upserts and deletes, one-shot reads, and live queries that push a fresh
//! [`Snapshot`] of a collection every time one of its documents changes.
//!
//! Two implementations ship here: [`MemoryStore`], an in-process store, and
//! [`RemoteStore`], a client for `taskdeck-server` over WebSocket.

pub mod document;
pub mod memory;
pub mod path;
pub mod policy;
pub mod protocol;
pub mod remote;
pub mod store;
pub mod subscription;

pub use document::{server_timestamp, Document, Fields, Snapshot};
pub use memory::MemoryStore;
pub use path::{CollectionRef, DocumentRef};
pub use policy::{AccessPolicy, AllowAll, Operation, OwnRecordOnly, ScopedStore};
pub use protocol::{ClientFrame, ServerFrame};
pub use remote::{RemoteConfig, RemoteStore};
pub use store::DocumentStore;
pub use subscription::Subscription;

pub use taskdeck_common::StoreError;
