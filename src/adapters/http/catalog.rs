//! `FirmwareApi` and `ModelApi` over `/api/firmware` and `/api/model`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;

use crate::domain::foundation::{DeviceId, FirmwareId, ModelId};
use crate::ports::{
    ApiError, ApiResult, Artifact, Firmware, FirmwareApi, FirmwareUpload, Model, ModelApi,
    ModelUpload,
};

use super::client::HttpBackendClient;

fn file_part(artifact: Artifact) -> Part {
    Part::bytes(artifact.bytes).file_name(artifact.file_name)
}

#[async_trait]
impl FirmwareApi for HttpBackendClient {
    async fn list(&self) -> ApiResult<Vec<Firmware>> {
        let request = self.authorized(Method::GET, "/api/firmware").await?;
        self.send(request).await?.into_list("firmwares")
    }

    async fn upload(&self, upload: FirmwareUpload) -> ApiResult<Firmware> {
        let form = Form::new()
            .text("name", upload.name)
            .text("description", upload.description)
            .part("file", file_part(upload.artifact));
        let request = self
            .authorized(Method::POST, "/api/firmware")
            .await?
            .multipart(form);
        self.send(request).await?.into_first("firmwares")
    }

    async fn delete(&self, firmware_id: &FirmwareId) -> ApiResult<()> {
        let path = format!("/api/firmware/{}", firmware_id);
        let request = self.authorized(Method::DELETE, &path).await?;
        self.send(request).await?.into_unit()
    }
}

#[async_trait]
impl ModelApi for HttpBackendClient {
    async fn list(&self) -> ApiResult<Vec<Model>> {
        let request = self.authorized(Method::GET, "/api/model").await?;
        self.send(request).await?.into_list("models")
    }

    async fn list_for_device(&self, device_id: &DeviceId) -> ApiResult<Vec<Model>> {
        let path = format!("/api/model/device/{}", device_id);
        let request = self.authorized(Method::GET, &path).await?;
        self.send(request).await?.into_list("models")
    }

    async fn upload(&self, upload: ModelUpload) -> ApiResult<Model> {
        let labels = serde_json::to_string(&upload.labels)
            .map_err(|e| ApiError::client_error(e.to_string()))?;
        let form = Form::new()
            .text("name", upload.name)
            .text("description", upload.description)
            .text("model_type", upload.model_type)
            .text("labels", labels)
            .part("file", file_part(upload.artifact));
        let request = self
            .authorized(Method::POST, "/api/model")
            .await?
            .multipart(form);
        self.send(request).await?.into_first("models")
    }

    async fn delete(&self, model_id: &ModelId) -> ApiResult<()> {
        let path = format!("/api/model/{}", model_id);
        let request = self.authorized(Method::DELETE, &path).await?;
        self.send(request).await?.into_unit()
    }
}
