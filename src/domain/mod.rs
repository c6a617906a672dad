//! Domain layer containing device-console business types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, session identity, errors)
//! - `device` - Device runtime state and the lifecycle reducer
//! - `realtime` - Realtime event protocol, buffers and the transition log

pub mod device;
pub mod foundation;
pub mod realtime;
