//! Inbound realtime event protocol.
//!
//! Every textual frame the server pushes is a JSON object discriminated by
//! its `action` field:
//!
//! ```text
//! { action: "CONNECTED", device_id }
//! { action: "DISCONNECTED", device_id }
//! { action: "OTA", device_id, status, firmware_name? }
//! { action: "MODE_SWITCH", device_id, status, mode? }
//! { action: "MODEL_SWITCH", device_id, status, model_name? }
//! { action: "MODEL_DOWNLOAD", device_id, status, model_id? }
//! { action: "INFERENCE_RESULT", device_id, image_data }
//! { action: "LOG", device_id, level, message }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::device::OperationMode;
use crate::domain::foundation::{DeviceId, ModelId, Timestamp};

/// Phase of a multi-phase device job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Received,
    Completed,
    Error,
}

/// Severity of a device log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Event,
}

/// One decoded inbound control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundEvent {
    Connected {
        device_id: DeviceId,
    },
    Disconnected {
        device_id: DeviceId,
    },
    Ota {
        device_id: DeviceId,
        status: JobStatus,
        #[serde(default)]
        firmware_name: Option<String>,
    },
    ModeSwitch {
        device_id: DeviceId,
        status: JobStatus,
        #[serde(default)]
        mode: Option<OperationMode>,
    },
    ModelSwitch {
        device_id: DeviceId,
        status: JobStatus,
        #[serde(default)]
        model_name: Option<String>,
    },
    ModelDownload {
        device_id: DeviceId,
        status: JobStatus,
        #[serde(default)]
        model_id: Option<ModelId>,
    },
    InferenceResult {
        device_id: DeviceId,
        image_data: String,
    },
    Log {
        device_id: DeviceId,
        level: LogLevel,
        message: String,
    },
}

impl InboundEvent {
    pub fn device_id(&self) -> &DeviceId {
        match self {
            InboundEvent::Connected { device_id }
            | InboundEvent::Disconnected { device_id }
            | InboundEvent::Ota { device_id, .. }
            | InboundEvent::ModeSwitch { device_id, .. }
            | InboundEvent::ModelSwitch { device_id, .. }
            | InboundEvent::ModelDownload { device_id, .. }
            | InboundEvent::InferenceResult { device_id, .. }
            | InboundEvent::Log { device_id, .. } => device_id,
        }
    }
}

/// Action names this client understands.
pub const KNOWN_ACTIONS: &[&str] = &[
    "CONNECTED",
    "DISCONNECTED",
    "OTA",
    "MODE_SWITCH",
    "MODEL_SWITCH",
    "MODEL_DOWNLOAD",
    "INFERENCE_RESULT",
    "LOG",
];

/// Why an inbound textual frame was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Frame is not valid JSON: {0}")]
    Malformed(String),

    #[error("Frame has no string 'action' field")]
    MissingAction,

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Invalid payload for action '{action}': {reason}")]
    InvalidPayload { action: String, reason: String },
}

/// Parses one textual frame into a typed event.
///
/// Unknown actions are reported separately from malformed payloads so the
/// caller can log them at the right level.
pub fn parse_frame(text: &str) -> Result<InboundEvent, FrameError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;

    let action = value
        .get("action")
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingAction)?
        .to_string();

    if !KNOWN_ACTIONS.contains(&action.as_str()) {
        return Err(FrameError::UnknownAction(action));
    }

    serde_json::from_value(value).map_err(|e| FrameError::InvalidPayload {
        action,
        reason: e.to_string(),
    })
}

/// One line of device log output, as retained in a log buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub received_at: Timestamp,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            received_at: Timestamp::now(),
        }
    }
}
