//! Device Console - realtime device-management client.
//!
//! Authenticates against the device backend, keeps one realtime channel
//! open per session and folds the device lifecycle events it receives into
//! per-consumer device state. Inference images and device logs are kept in
//! bounded per-device buffers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
