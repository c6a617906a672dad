//! Device REST API port.
//!
//! Commands here only *start* device jobs. Their outcome arrives later as
//! realtime events and is folded in by the lifecycle reducer.

use async_trait::async_trait;
use secrecy::Secret;

use crate::domain::device::{Device, OperationMode};
use crate::domain::foundation::{DeviceId, FirmwareId, ModelId};

use super::{ApiError, ApiResult};

/// Per-device outcome of a multi-device job request.
///
/// The backend takes one device per request, so some targets may start the
/// job while others refuse it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deployment {
    /// Devices whose job the backend accepted, in request order.
    pub accepted: Vec<DeviceId>,
    /// Devices the backend refused, with the error it returned.
    pub rejected: Vec<(DeviceId, ApiError)>,
}

impl Deployment {
    pub fn accept(&mut self, device_id: DeviceId) {
        self.accepted.push(device_id);
    }

    pub fn reject(&mut self, device_id: DeviceId, error: ApiError) {
        self.rejected.push((device_id, error));
    }

    /// True when every target accepted the job.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Device management operations.
///
/// # Contract
///
/// Implementations must:
/// - Return the REST snapshot of devices unchanged (no realtime folding)
/// - Return `Ok` from a job command once the backend has *accepted* the job
/// - Attempt every target of a multi-device job and report each outcome
/// - Surface handled backend failures as `ApiError` with the server's code
/// - Synthesize `CLIENT_ERROR` when no response was received
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn list(&self) -> ApiResult<Vec<Device>>;

    async fn get(&self, device_id: &DeviceId) -> ApiResult<Device>;

    async fn delete_many(&self, device_ids: &[DeviceId]) -> ApiResult<()>;

    /// Provisions a new device onto the given Wi-Fi network.
    async fn pair(&self, ssid: &str, password: &Secret<String>) -> ApiResult<()>;

    async fn switch_mode(&self, device_id: &DeviceId, mode: OperationMode) -> ApiResult<()>;

    async fn restart(&self, device_id: &DeviceId) -> ApiResult<()>;

    async fn run_inference(&self, device_id: &DeviceId) -> ApiResult<()>;

    /// Starts an OTA job on every listed device.
    async fn deploy_firmware(
        &self,
        device_ids: &[DeviceId],
        firmware_id: &FirmwareId,
    ) -> Deployment;

    /// Starts a model download on every listed device.
    async fn deploy_model(&self, device_ids: &[DeviceId], model_id: &ModelId) -> Deployment;

    /// Activates a model already downloaded to the device.
    async fn switch_model(&self, device_id: &DeviceId, model_id: &ModelId) -> ApiResult<()>;
}
