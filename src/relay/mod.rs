//! Session relay: pairs clients and forwards input events between them

pub mod service;
pub mod store;

pub use service::{ConnectionHandle, ConnectionId, Relay, RelayError};
pub use store::{InMemorySessionStore, SessionStore};
