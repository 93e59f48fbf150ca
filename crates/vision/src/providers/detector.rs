use std::time::Duration;

use async_trait::async_trait;
use mealscan_core::Detections;
use reqwest::Client;

use super::{decode, http_client, send, FoodDetector, ImageUpload, ProviderError};
use crate::config::ConfigError;
use crate::secrets::{keys, Secrets};

const PROVIDER: &str = "detection";

/// Client for the self-hosted YOLO inference server (`POST /predict`).
pub struct DetectionServer {
    client: Client,
    url: String,
}

impl DetectionServer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self { client: http_client(timeout)?, url: url.into() })
    }

    pub fn from_secrets(secrets: &Secrets, timeout: Duration) -> Result<Self, ConfigError> {
        Self::new(secrets.require(keys::DETECTION_URL)?, timeout)
    }
}

#[async_trait]
impl FoodDetector for DetectionServer {
    async fn detect(&self, image: &ImageUpload) -> Result<Detections, ProviderError> {
        let form = reqwest::multipart::Form::new().part("food_image", image.part(PROVIDER)?);
        let request = self.client.post(&self.url).multipart(form);

        let body = send(PROVIDER, request).await?;
        let detections: Detections = decode(PROVIDER, &body)?;
        tracing::info!(count = detections.len(), "Object detection finished");
        Ok(detections)
    }
}
