//! Device runtime state.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DeviceId, ModelId};

use super::{BusyReason, DeviceStatus, OperationMode};

/// Runtime state of one device.
///
/// Created from a REST snapshot and afterwards mutated only by folding
/// lifecycle transitions (see [`super::reducer`]) or by an optimistic
/// [`Device::mark_busy`] right after a job command was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_reason: Option<BusyReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_model_id: Option<ModelId>,
    #[serde(
        default,
        alias = "operation_model",
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_mode: Option<OperationMode>,
}

impl Device {
    /// Creates a disconnected device with only identity fields set.
    pub fn new(id: DeviceId, name: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mac: mac.into(),
            description: String::new(),
            status: DeviceStatus::Disconnected,
            busy_reason: None,
            firmware_name: None,
            model_name: None,
            current_model_id: None,
            operation_mode: None,
        }
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.status == DeviceStatus::Busy
    }

    /// Optimistic update after a job command was accepted by the backend.
    pub fn mark_busy(&mut self, reason: BusyReason) {
        self.status = DeviceStatus::Busy;
        self.busy_reason = Some(reason);
    }
}
