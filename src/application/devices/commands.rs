//! DeviceCommandHandler - issues device commands through the REST API.
//!
//! Job commands (OTA, mode switch, model switch, model deployment) are
//! refused up front when a target device is unknown or already busy. Every
//! device whose job the backend accepts is marked busy in the caller's
//! tracker, even when other targets refuse; the matching realtime completion
//! clears it again.

use std::sync::Arc;

use secrecy::Secret;
use thiserror::Error;
use tracing::info;

use crate::domain::device::{BusyReason, OperationMode};
use crate::domain::foundation::{DeviceId, ErrorCode, FirmwareId, ModelId};
use crate::ports::{ApiError, ApiResponse, ApiResult, Deployment, DeviceApi};

use super::tracker::DeviceTracker;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Device {0} is busy")]
    DeviceBusy(DeviceId),

    #[error("Device {0} is not known")]
    DeviceNotFound(DeviceId),

    /// A multi-device job was refused for `device_id`. The devices in
    /// `accepted` did start it and are marked busy.
    #[error("Device {device_id} refused the job: {source}")]
    Refused {
        device_id: DeviceId,
        accepted: Vec<DeviceId>,
        source: ApiError,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CommandError {
    /// Error code as surfaced to the user.
    pub fn code(&self) -> &str {
        match self {
            CommandError::DeviceBusy(_) => ErrorCode::DeviceBusy.as_str(),
            CommandError::DeviceNotFound(_) => ErrorCode::DeviceNotFound.as_str(),
            CommandError::Refused { source, .. } => &source.code,
            CommandError::Api(e) => &e.code,
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::DeviceBusy(id) => {
                ApiError::from_code(ErrorCode::DeviceBusy, format!("Device {} is busy", id))
            }
            CommandError::DeviceNotFound(id) => {
                ApiError::from_code(ErrorCode::DeviceNotFound, format!("Device {} is not known", id))
            }
            CommandError::Refused { source, .. } => source,
            CommandError::Api(e) => e,
        }
    }
}

pub struct DeviceCommandHandler {
    device_api: Arc<dyn DeviceApi>,
}

impl DeviceCommandHandler {
    pub fn new(device_api: Arc<dyn DeviceApi>) -> Self {
        Self { device_api }
    }

    // ============================================
    // Job commands
    // ============================================

    /// Starts an OTA firmware update on every device in `device_ids`.
    ///
    /// Returns the devices now busy with the update. If any device refused,
    /// the first refusal is returned instead; the accepted devices are still
    /// marked busy.
    pub async fn update_firmware(
        &self,
        tracker: &mut DeviceTracker,
        device_ids: &[DeviceId],
        firmware_id: &FirmwareId,
    ) -> Result<Vec<DeviceId>, CommandError> {
        ensure_idle(tracker, device_ids)?;
        let deployment = self
            .device_api
            .deploy_firmware(device_ids, firmware_id)
            .await;
        mark_all(tracker, &deployment.accepted, BusyReason::Ota);
        info!(
            firmware_id = %firmware_id,
            accepted = deployment.accepted.len(),
            refused = deployment.rejected.len(),
            "OTA requested"
        );
        settle(deployment)
    }

    pub async fn switch_mode(
        &self,
        tracker: &mut DeviceTracker,
        device_id: &DeviceId,
        mode: OperationMode,
    ) -> Result<ApiResponse<()>, CommandError> {
        let targets = std::slice::from_ref(device_id);
        ensure_idle(tracker, targets)?;
        let response = self.device_api.switch_mode(device_id, mode).await?;
        mark_all(tracker, targets, BusyReason::ModeSwitch);
        info!(device_id = %device_id, mode = ?mode, "Mode switch started");
        Ok(response)
    }

    pub async fn switch_model(
        &self,
        tracker: &mut DeviceTracker,
        device_id: &DeviceId,
        model_id: &ModelId,
    ) -> Result<ApiResponse<()>, CommandError> {
        let targets = std::slice::from_ref(device_id);
        ensure_idle(tracker, targets)?;
        let response = self.device_api.switch_model(device_id, model_id).await?;
        mark_all(tracker, targets, BusyReason::ModelSwitch);
        info!(device_id = %device_id, model_id = %model_id, "Model switch started");
        Ok(response)
    }

    /// Starts a model download on every device in `device_ids`.
    ///
    /// Partial refusals behave as in [`Self::update_firmware`].
    pub async fn deploy_model(
        &self,
        tracker: &mut DeviceTracker,
        device_ids: &[DeviceId],
        model_id: &ModelId,
    ) -> Result<Vec<DeviceId>, CommandError> {
        ensure_idle(tracker, device_ids)?;
        let deployment = self.device_api.deploy_model(device_ids, model_id).await;
        mark_all(tracker, &deployment.accepted, BusyReason::ModelDownload);
        info!(
            model_id = %model_id,
            accepted = deployment.accepted.len(),
            refused = deployment.rejected.len(),
            "Model deployment requested"
        );
        settle(deployment)
    }

    // ============================================
    // Pass-through commands
    // ============================================

    pub async fn restart(&self, device_id: &DeviceId) -> ApiResult<()> {
        self.device_api.restart(device_id).await
    }

    pub async fn run_inference(&self, device_id: &DeviceId) -> ApiResult<()> {
        self.device_api.run_inference(device_id).await
    }

    pub async fn pair(&self, ssid: &str, password: &Secret<String>) -> ApiResult<()> {
        self.device_api.pair(ssid, password).await
    }

    pub async fn delete(&self, device_ids: &[DeviceId]) -> ApiResult<()> {
        self.device_api.delete_many(device_ids).await
    }
}

fn ensure_idle(tracker: &DeviceTracker, device_ids: &[DeviceId]) -> Result<(), CommandError> {
    for id in device_ids {
        match tracker.device(id) {
            None => return Err(CommandError::DeviceNotFound(id.clone())),
            Some(device) if device.is_busy() => return Err(CommandError::DeviceBusy(id.clone())),
            Some(_) => {}
        }
    }
    Ok(())
}

/// Accepted devices on success, otherwise the first refusal.
fn settle(deployment: Deployment) -> Result<Vec<DeviceId>, CommandError> {
    let Deployment { accepted, rejected } = deployment;
    match rejected.into_iter().next() {
        None => Ok(accepted),
        Some((device_id, source)) => Err(CommandError::Refused {
            device_id,
            accepted,
            source,
        }),
    }
}

fn mark_all(tracker: &mut DeviceTracker, device_ids: &[DeviceId], reason: BusyReason) {
    for id in device_ids {
        tracker.mark_busy(id, reason);
    }
}
