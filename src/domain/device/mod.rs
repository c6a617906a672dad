//! Device module - runtime device state and its lifecycle reducer.
//!
//! - [`Device`] - runtime state created from a REST snapshot
//! - [`LifecycleTransition`] - one state change derived from a realtime event
//! - [`reducer`] - pure fold of transitions into device state

mod device;
pub mod reducer;
mod status;
mod transition;

pub use device::Device;
pub use reducer::{apply_to_fleet, apply_transition};
pub use status::{BusyReason, DeviceStatus, OperationMode};
pub use transition::{LifecycleTransition, TransitionAction};
