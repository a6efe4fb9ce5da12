//! Live task presence.
//!
//! Tracks which principals currently have a task's detail view open. Each
//! viewer owns one record at `presence/{task}/users/{subject}`: written when
//! the view opens, deleted when it closes. The viewer list is a live query
//! over the task's `users` collection.
//!
//! Presence is best-effort. Write failures are logged and swallowed, and a
//! client that dies without leaving keeps its record until something else
//! removes it.

mod ops;
mod paths;
mod tracker;
mod types;

#[cfg(test)]
mod tests;

pub use ops::{join, leave, subscribe, ViewerStream};
pub use paths::{viewer_doc, viewers_collection, write_policy, PRESENCE_ROOT, VIEWERS_COLLECTION};
pub use tracker::{PresenceContext, PresenceTracker};
pub use types::{PresenceOptions, PresenceState, Principal, ViewerRecord};
