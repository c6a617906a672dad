//! REST adapters for the device backend.
//!
//! One reqwest-based [`HttpBackendClient`] implements every REST
//! collaborator port:
//!
//! | Port          | Endpoints                  |
//! |---------------|----------------------------|
//! | `AuthApi`     | `/api/user/...`            |
//! | `DeviceApi`   | `/api/device/...`          |
//! | `FirmwareApi` | `/api/firmware/...`        |
//! | `ModelApi`    | `/api/model/...`           |

mod auth;
mod catalog;
mod client;
mod devices;
mod envelope;

pub use client::HttpBackendClient;
