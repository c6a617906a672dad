//! Device lifecycle reducer.
//!
//! Folds one lifecycle transition into device state, resolving the
//! multi-phase busy protocol back into the simple status model.
//!
//! # Rules
//!
//! | Transition     | Effect                                                        |
//! |----------------|---------------------------------------------------------------|
//! | `CONNECTED`    | `status = connected`, `busy_reason` cleared. If the device was |
//! |                | busy with OTA and the transition names a firmware, record it; |
//! |                | likewise model name for MODEL_SWITCH and mode for MODE_SWITCH |
//! | `DISCONNECTED` | `status = disconnected`, `busy_reason` untouched              |
//! | `BUSY`         | `status = busy`, `busy_reason` untouched                      |

use super::{BusyReason, Device, DeviceStatus, LifecycleTransition, TransitionAction};

/// Applies one transition to a device, returning the new state.
///
/// The transition is assumed to target `device`; callers that hold many
/// devices should go through [`apply_to_fleet`].
pub fn apply_transition(device: &Device, transition: &LifecycleTransition) -> Device {
    let mut next = device.clone();

    match transition.action {
        TransitionAction::Connected => {
            match (device.busy_reason, transition) {
                (
                    Some(BusyReason::Ota),
                    LifecycleTransition {
                        firmware_name: Some(firmware),
                        ..
                    },
                ) => {
                    next.firmware_name = Some(firmware.clone());
                }
                (
                    Some(BusyReason::ModelSwitch),
                    LifecycleTransition {
                        model_name: Some(model),
                        ..
                    },
                ) => {
                    next.model_name = Some(model.clone());
                }
                (
                    Some(BusyReason::ModeSwitch),
                    LifecycleTransition {
                        mode: Some(mode), ..
                    },
                ) => {
                    next.operation_mode = Some(*mode);
                }
                _ => {}
            }
            next.status = DeviceStatus::Connected;
            next.busy_reason = None;
        }
        TransitionAction::Disconnected => {
            next.status = DeviceStatus::Disconnected;
        }
        TransitionAction::Busy => {
            next.status = DeviceStatus::Busy;
        }
    }

    next
}

/// Applies a transition to whichever device in `devices` it targets.
///
/// Returns `false` (and changes nothing) when no device matches.
pub fn apply_to_fleet(devices: &mut [Device], transition: &LifecycleTransition) -> bool {
    match devices.iter_mut().find(|d| d.id == transition.device_id) {
        Some(device) => {
            *device = apply_transition(device, transition);
            true
        }
        None => false,
    }
}
