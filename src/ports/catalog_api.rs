//! Firmware and model catalogue ports.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DeviceId, FirmwareId, ModelId};

use super::ApiResult;

/// Firmware image known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firmware {
    pub id: FirmwareId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// AI model known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub description: String,
    /// Class index to label name.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// A file to upload alongside catalogue metadata.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FirmwareUpload {
    pub name: String,
    pub description: String,
    pub artifact: Artifact,
}

#[derive(Debug, Clone)]
pub struct ModelUpload {
    pub name: String,
    pub description: String,
    pub model_type: String,
    pub labels: BTreeMap<String, String>,
    pub artifact: Artifact,
}

/// Firmware catalogue.
///
/// # Contract
///
/// - `upload` returns the created entry
/// - Failures follow the `ApiError` rules of [`super::DeviceApi`]
#[async_trait]
pub trait FirmwareApi: Send + Sync {
    async fn list(&self) -> ApiResult<Vec<Firmware>>;

    async fn upload(&self, upload: FirmwareUpload) -> ApiResult<Firmware>;

    async fn delete(&self, firmware_id: &FirmwareId) -> ApiResult<()>;
}

/// Model catalogue.
#[async_trait]
pub trait ModelApi: Send + Sync {
    async fn list(&self) -> ApiResult<Vec<Model>>;

    /// Models already downloaded to `device_id`.
    async fn list_for_device(&self, device_id: &DeviceId) -> ApiResult<Vec<Model>>;

    async fn upload(&self, upload: ModelUpload) -> ApiResult<Model>;

    async fn delete(&self, model_id: &ModelId) -> ApiResult<()>;
}
