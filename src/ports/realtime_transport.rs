//! Realtime transport port - one persistent inbound connection per user.
//!
//! The channel only receives; the outbound direction is unused.
//!
//! # Example
//!
//! ```ignore
//! let mut stream = transport.connect(&user_id, &credential).await?;
//! while let Some(frame) = stream.next_frame().await {
//!     match frame? {
//!         InboundFrame::Text(text) => handle_json(text),
//!         InboundFrame::Binary(bytes) => handle_legacy_image(bytes),
//!     }
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{BearerCredential, UserId};

/// One frame delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// JSON control message.
    Text(String),
    /// Raw binary payload (legacy single-image mode).
    Binary(Vec<u8>),
}

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Invalid realtime endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Connection refused: {0}")]
    Refused(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Connection already closed")]
    Closed,
}

/// Opens realtime connections.
///
/// # Contract
///
/// Implementations must:
/// - Address the connection by `user_id`
/// - Present `credential` during the handshake
/// - Resolve only once the handshake has completed
/// - Return `TransportError::Refused` when the peer rejects the handshake
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn connect(
        &self,
        user_id: &UserId,
        credential: &BearerCredential,
    ) -> Result<Box<dyn TransportStream>, TransportError>;
}

/// An open connection.
///
/// # Contract
///
/// - `next_frame` yields frames in the order the peer sent them
/// - `next_frame` returns `None` once the peer closed the connection
/// - `close` is idempotent; closing a closed stream returns `Ok(())`
#[async_trait]
pub trait TransportStream: Send {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>>;

    async fn close(&mut self) -> Result<(), TransportError>;
}
