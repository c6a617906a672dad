//! Realtime transport adapters.
//!
//! Implementations of the `RealtimeTransport` port:
//!
//! - [`transport`] - WebSocket client (tokio-tungstenite)
//! - [`in_memory`] - test transport driven from the server side

pub mod in_memory;
pub mod transport;

pub use in_memory::{InMemoryTransport, PendingConnection, ServerHandle};
pub use transport::TungsteniteTransport;
