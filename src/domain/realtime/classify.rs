//! Routing of inbound events to the realtime sinks.
//!
//! | Event                           | Routed to                                       |
//! |---------------------------------|-------------------------------------------------|
//! | `CONNECTED` / `DISCONNECTED`    | transition of the same action                   |
//! | job, `RECEIVED`                 | `BUSY` transition                               |
//! | job, `COMPLETED`                | `CONNECTED` transition + job payload field      |
//! | job, `ERROR`                    | `CONNECTED` transition, payload dropped         |
//! | `INFERENCE_RESULT`              | image buffer (still base64, decoded later)      |
//! | `LOG`                           | log buffer                                      |

use crate::domain::device::LifecycleTransition;
use crate::domain::foundation::DeviceId;

use super::event::{InboundEvent, JobStatus, LogEntry};

/// Where one inbound event must be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutedEvent {
    Transition(LifecycleTransition),
    Image { device_id: DeviceId, encoded: String },
    Log { device_id: DeviceId, entry: LogEntry },
}

/// Maps a job phase onto a transition, attaching `payload` only on completion.
fn job_transition(
    device_id: DeviceId,
    status: JobStatus,
    attach: impl FnOnce(LifecycleTransition) -> LifecycleTransition,
) -> LifecycleTransition {
    match status {
        JobStatus::Received => LifecycleTransition::busy(device_id),
        JobStatus::Completed => attach(LifecycleTransition::connected(device_id)),
        JobStatus::Error => LifecycleTransition::connected(device_id),
    }
}

/// Classifies an inbound event.
pub fn classify(event: InboundEvent) -> RoutedEvent {
    let transition = match event {
        InboundEvent::Connected { device_id } => LifecycleTransition::connected(device_id),
        InboundEvent::Disconnected { device_id } => LifecycleTransition::disconnected(device_id),
        InboundEvent::Ota {
            device_id,
            status,
            firmware_name,
        } => job_transition(device_id, status, |t| t.with_firmware_name(firmware_name)),
        InboundEvent::ModeSwitch {
            device_id,
            status,
            mode,
        } => job_transition(device_id, status, |t| t.with_mode(mode)),
        InboundEvent::ModelSwitch {
            device_id,
            status,
            model_name,
        } => job_transition(device_id, status, |t| t.with_model_name(model_name)),
        InboundEvent::ModelDownload {
            device_id,
            status,
            model_id,
        } => job_transition(device_id, status, |t| t.with_model_id(model_id)),
        InboundEvent::InferenceResult {
            device_id,
            image_data,
        } => {
            return RoutedEvent::Image {
                device_id,
                encoded: image_data,
            }
        }
        InboundEvent::Log {
            device_id,
            level,
            message,
        } => {
            return RoutedEvent::Log {
                device_id,
                entry: LogEntry::new(level, message),
            }
        }
    };

    RoutedEvent::Transition(transition)
}
