//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Credential stores and a mock auth API
//! - `display` - In-memory frame display registry
//! - `http` - reqwest client for the backend REST API
//! - `websocket` - Realtime transports (tokio-tungstenite, in-memory)

pub mod auth;
pub mod display;
pub mod http;
pub mod websocket;

pub use auth::{FileCredentialStore, InMemoryCredentialStore, MockAuthApi};
pub use display::InMemoryFrameDisplay;
pub use http::HttpBackendClient;
pub use websocket::{InMemoryTransport, TungsteniteTransport};
