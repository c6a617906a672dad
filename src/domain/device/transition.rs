//! Device lifecycle transitions derived from inbound realtime events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DeviceId, ModelId};

use super::OperationMode;

/// What happened to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionAction {
    /// Device is online and idle; clears any outstanding job.
    Connected,
    Disconnected,
    /// A job has started on the device.
    Busy,
}

/// A single device lifecycle state change.
///
/// Payload fields are only present on a `Connected` transition produced by a
/// job's `COMPLETED` phase; which one depends on the job kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleTransition {
    pub action: TransitionAction,
    pub device_id: DeviceId,
    /// Mode reached by a completed mode switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<OperationMode>,
    /// Model activated by a completed model switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Firmware installed by a completed OTA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_name: Option<String>,
    /// Model fetched by a completed model download.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<ModelId>,
}

impl LifecycleTransition {
    fn bare(action: TransitionAction, device_id: DeviceId) -> Self {
        Self {
            action,
            device_id,
            mode: None,
            model_name: None,
            firmware_name: None,
            model_id: None,
        }
    }

    /// `CONNECTED` without payload.
    pub fn connected(device_id: DeviceId) -> Self {
        Self::bare(TransitionAction::Connected, device_id)
    }

    /// `DISCONNECTED` for `device_id`.
    pub fn disconnected(device_id: DeviceId) -> Self {
        Self::bare(TransitionAction::Disconnected, device_id)
    }

    /// `BUSY` for `device_id`. The job kind is not known at this point.
    pub fn busy(device_id: DeviceId) -> Self {
        Self::bare(TransitionAction::Busy, device_id)
    }

    /// Attaches the mode-switch result.
    pub fn with_mode(mut self, mode: Option<OperationMode>) -> Self {
        self.mode = mode;
        self
    }

    /// Attaches the model-switch result.
    pub fn with_model_name(mut self, model_name: Option<String>) -> Self {
        self.model_name = model_name;
        self
    }

    /// Attaches the OTA result.
    pub fn with_firmware_name(mut self, firmware_name: Option<String>) -> Self {
        self.firmware_name = firmware_name;
        self
    }

    /// Attaches the model-download result.
    pub fn with_model_id(mut self, model_id: Option<ModelId>) -> Self {
        self.model_id = model_id;
        self
    }
}
