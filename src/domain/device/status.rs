//! Device status, busy reason and operation mode enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Connection status of a device as seen by the dashboard.
///
/// Serialized lowercase. Parsing is case-insensitive because older REST
/// snapshots reported `"Connected"`/`"Disconnected"`/`"Busy"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum DeviceStatus {
    Connected,
    #[default]
    Disconnected,
    Busy,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Connected => "connected",
            DeviceStatus::Disconnected => "disconnected",
            DeviceStatus::Busy => "busy",
        }
    }
}

impl FromStr for DeviceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "connected" => Ok(DeviceStatus::Connected),
            "disconnected" => Ok(DeviceStatus::Disconnected),
            "busy" => Ok(DeviceStatus::Busy),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown device status '{}'", other),
            )),
        }
    }
}

impl TryFrom<String> for DeviceStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The outstanding multi-phase job holding a device in `busy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusyReason {
    ModeSwitch,
    Ota,
    ModelSwitch,
    ModelDownload,
}

impl fmt::Display for BusyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BusyReason::ModeSwitch => "MODE_SWITCH",
            BusyReason::Ota => "OTA",
            BusyReason::ModelSwitch => "MODEL_SWITCH",
            BusyReason::ModelDownload => "MODEL_DOWNLOAD",
        };
        write!(f, "{}", s)
    }
}

/// Inference operation mode of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperationMode {
    #[default]
    #[serde(rename = "STAND_BY_MODE")]
    StandBy,
    #[serde(rename = "CONTINUOUS_MODE")]
    Continuous,
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationMode::StandBy => "STAND_BY_MODE",
            OperationMode::Continuous => "CONTINUOUS_MODE",
        };
        write!(f, "{}", s)
    }
}
