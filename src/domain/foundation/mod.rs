//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the device console.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, BearerCredential, Session, UserIdentity};
pub use errors::{ErrorCode, ValidationError};
pub use ids::{ConnectionId, DeviceId, FirmwareId, ModelId, UserId};
pub use timestamp::Timestamp;
