use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mealscan_core::OcrResponse;
use reqwest::Client;
use serde::Serialize;

use super::{decode, http_client, send, ImageUpload, ProviderError, ReceiptReader};
use crate::config::ConfigError;
use crate::secrets::{keys, Secrets};

const PROVIDER: &str = "ocr";

/// Receipt OCR over the CLOVA-style general/receipt endpoint.
pub struct ClovaOcr {
    client: Client,
    invoke_url: String,
    secret_key: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OcrMessage {
    images: Vec<ImageSpec>,
    #[serde(rename = "requestId")]
    request_id: String,
    version: &'static str,
    timestamp: i64,
}

#[derive(Debug, Serialize)]
struct ImageSpec {
    format: String,
    name: &'static str,
}

impl OcrMessage {
    pub(crate) fn new(format: String, now: DateTime<Utc>) -> Self {
        Self {
            images: vec![ImageSpec { format, name: "demo" }],
            request_id: uuid::Uuid::new_v4().to_string(),
            version: "V2",
            timestamp: now.timestamp_millis(),
        }
    }
}

impl ClovaOcr {
    pub fn new(
        invoke_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(timeout)?,
            invoke_url: invoke_url.into(),
            secret_key: secret_key.into(),
        })
    }

    pub fn from_secrets(secrets: &Secrets, timeout: Duration) -> Result<Self, ConfigError> {
        Self::new(
            secrets.require(keys::OCR_INVOKE_URL)?,
            secrets.require(keys::OCR_SECRET_KEY)?,
            timeout,
        )
    }
}

#[async_trait]
impl ReceiptReader for ClovaOcr {
    async fn read(&self, image: &ImageUpload) -> Result<OcrResponse, ProviderError> {
        let message = OcrMessage::new(image.format(), Utc::now());
        let message = serde_json::to_string(&message)
            .map_err(|source| ProviderError::Encode { provider: PROVIDER, source })?;

        let form = reqwest::multipart::Form::new()
            .text("message", message)
            .part("file", image.part(PROVIDER)?);

        tracing::debug!(file = %image.file_name, bytes = image.bytes.len(), "Sending image to OCR");
        let request = self
            .client
            .post(&self.invoke_url)
            .header("X-OCR-SECRET", &self.secret_key)
            .multipart(form);

        let body = send(PROVIDER, request).await?;
        decode(PROVIDER, &body)
    }
}
