//! `DeviceApi` over `/api/device`.

use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, Secret};
use serde_json::json;

use crate::domain::device::{Device, OperationMode};
use crate::domain::foundation::{DeviceId, FirmwareId, ModelId};
use crate::ports::{ApiResult, Deployment, DeviceApi};

use super::client::HttpBackendClient;

impl HttpBackendClient {
    async fn get_unit(&self, path: &str) -> ApiResult<()> {
        let request = self.authorized(Method::GET, path).await?;
        self.send(request).await?.into_unit()
    }

    async fn post_unit(&self, path: &str, body: serde_json::Value) -> ApiResult<()> {
        let request = self.authorized(Method::POST, path).await?.json(&body);
        self.send(request).await?.into_unit()
    }

    /// The deployment endpoints take one device per request. Every device
    /// is attempted; a refusal for one does not stop the others.
    async fn deploy_each(
        &self,
        path: &str,
        device_ids: &[DeviceId],
        body: impl Fn(&DeviceId) -> serde_json::Value + Send + Sync,
    ) -> Deployment {
        let mut deployment = Deployment::default();
        for device_id in device_ids {
            match self.post_unit(path, body(device_id)).await {
                Ok(_) => {
                    tracing::debug!(device_id = %device_id, path, "Deployment accepted");
                    deployment.accept(device_id.clone());
                }
                Err(error) => {
                    tracing::warn!(
                        device_id = %device_id,
                        path,
                        code = %error.code,
                        "Deployment refused"
                    );
                    deployment.reject(device_id.clone(), error);
                }
            }
        }
        deployment
    }
}

#[async_trait]
impl DeviceApi for HttpBackendClient {
    async fn list(&self) -> ApiResult<Vec<Device>> {
        let request = self.authorized(Method::GET, "/api/device").await?;
        self.send(request).await?.into_list("devices")
    }

    async fn get(&self, device_id: &DeviceId) -> ApiResult<Device> {
        let path = format!("/api/device/{}", device_id);
        let request = self.authorized(Method::GET, &path).await?;
        self.send(request).await?.into_first("devices")
    }

    async fn delete_many(&self, device_ids: &[DeviceId]) -> ApiResult<()> {
        self.post_unit(
            "/api/device/delete-many",
            json!({ "device_ids": device_ids }),
        )
        .await
    }

    async fn pair(&self, ssid: &str, password: &Secret<String>) -> ApiResult<()> {
        self.post_unit(
            "/api/device/connection",
            json!({ "ssid": ssid, "password": password.expose_secret() }),
        )
        .await
    }

    async fn switch_mode(&self, device_id: &DeviceId, mode: OperationMode) -> ApiResult<()> {
        self.post_unit(
            &format!("/api/device/mode_switch/{}", device_id),
            json!({ "mode": mode }),
        )
        .await
    }

    async fn restart(&self, device_id: &DeviceId) -> ApiResult<()> {
        self.get_unit(&format!("/api/device/reset/{}", device_id))
            .await
    }

    async fn run_inference(&self, device_id: &DeviceId) -> ApiResult<()> {
        self.get_unit(&format!("/api/device/inference/{}", device_id))
            .await
    }

    async fn deploy_firmware(
        &self,
        device_ids: &[DeviceId],
        firmware_id: &FirmwareId,
    ) -> Deployment {
        self.deploy_each("/api/device/firmware/deployment", device_ids, |device_id| {
            json!({ "device_id": device_id, "firmware_id": firmware_id })
        })
        .await
    }

    async fn deploy_model(&self, device_ids: &[DeviceId], model_id: &ModelId) -> Deployment {
        self.deploy_each("/api/device/model/deployment", device_ids, |device_id| {
            json!({ "device_id": device_id, "model_id": model_id })
        })
        .await
    }

    async fn switch_model(&self, device_id: &DeviceId, model_id: &ModelId) -> ApiResult<()> {
        self.get_unit(&format!(
            "/api/device/model_switch/{}/{}",
            device_id, model_id
        ))
        .await
    }
}
