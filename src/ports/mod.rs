//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Realtime
//!
//! - `RealtimeTransport` / `TransportStream` - persistent inbound connection
//! - `FrameDisplay` - display handles for decoded inference images
//!
//! ## REST collaborators
//!
//! - `AuthApi` - credential issuance and verification
//! - `DeviceApi` - device listing and job commands
//! - `FirmwareApi`, `ModelApi` - catalogue management
//!
//! ## Local state
//!
//! - `CredentialStore` - persisted bearer credential

mod api_response;
mod auth_api;
mod catalog_api;
mod credential_store;
mod device_api;
mod frame_display;
mod realtime_transport;

pub use api_response::{ApiError, ApiResponse, ApiResult};
pub use auth_api::{AuthApi, LoginGrant, Registration};
pub use catalog_api::{
    Artifact, Firmware, FirmwareApi, FirmwareUpload, Model, ModelApi, ModelUpload,
};
pub use credential_store::{CredentialStore, CredentialStoreError};
pub use device_api::{Deployment, DeviceApi};
pub use frame_display::{DisplayError, DisplayHandle, FrameDisplay};
pub use realtime_transport::{InboundFrame, RealtimeTransport, TransportError, TransportStream};
