//! Realtime synchronization core of the Hibiki audience-feedback tool.
//!
//! A [`Session`](sync::Session) keeps one resilient channel to a room,
//! reconciles optimistic local actions with server broadcasts, derives
//! engagement metrics and raises presenter alerts.

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod sync;

pub use config::SyncConfig;
pub use sync::{Action, ConnectionState, RoomSnapshot, Session, SessionHandle};
