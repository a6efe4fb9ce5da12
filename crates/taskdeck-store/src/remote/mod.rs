//! WebSocket client for `taskdeck-server`.
//!
//! A background task owns the connection: it sends the hello, keeps the
//! socket alive with heartbeats, re-registers live queries after a
//! reconnect, and reconnects with exponential backoff. [`RemoteStore`] is a
//! cheap handle that talks to that task over a command channel.

mod client;
mod connection;
mod handler;
mod types;

pub use client::RemoteStore;
pub use types::RemoteConfig;
