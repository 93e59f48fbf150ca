pub mod clova;
pub mod detector;
pub mod kt;
pub mod mock;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use mealscan_core::{Detections, FoodData, OcrResponse};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use clova::ClovaOcr;
pub use detector::DetectionServer;
pub use kt::{FoodFlag, KtFood};
pub use mock::{MockDetector, MockReader, MockRecognizer};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Http { provider: &'static str, source: reqwest::Error },
    #[error("{provider} returned {status}: {body}")]
    Status { provider: &'static str, status: StatusCode, body: String },
    #[error("{provider} response could not be decoded: {source}")]
    Decode { provider: &'static str, source: serde_json::Error },
    #[error("{provider} request could not be encoded: {source}")]
    Encode { provider: &'static str, source: serde_json::Error },
    #[error("{provider} request could not be signed")]
    Signing { provider: &'static str },
}

/// An image ready to upload: encoded bytes plus the file name sent in the
/// multipart `filename` attribute.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), bytes }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());
        Ok(Self { file_name, bytes })
    }

    /// Lowercase extension, defaulting to `jpg`.
    pub fn format(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "jpg".to_string())
    }

    pub fn mime(&self) -> &'static str {
        match self.format().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            "tif" | "tiff" => "image/tiff",
            _ => "application/octet-stream",
        }
    }

    pub(crate) fn part(&self, provider: &'static str) -> Result<reqwest::multipart::Part, ProviderError> {
        reqwest::multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.mime())
            .map_err(|source| ProviderError::Http { provider, source })
    }
}

/// Reads receipts. Implementations return the provider's raw verdict; the
/// pipeline decides what "not a receipt" means.
#[async_trait]
pub trait ReceiptReader: Send + Sync {
    async fn read(&self, image: &ImageUpload) -> Result<OcrResponse, ProviderError>;
}

/// Classifies food regions in a photo.
#[async_trait]
pub trait FoodRecognizer: Send + Sync {
    async fn recognize(&self, image: &ImageUpload) -> Result<FoodData, ProviderError>;
}

/// Detects food objects in a photo.
#[async_trait]
pub trait FoodDetector: Send + Sync {
    async fn detect(&self, image: &ImageUpload) -> Result<Detections, ProviderError>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Send a request and return the body of a 2xx response. Transport failures
/// and non-2xx statuses are logged and returned as errors.
pub(crate) async fn send(provider: &'static str, request: RequestBuilder) -> Result<String, ProviderError> {
    let response = request.send().await.map_err(|source| {
        tracing::error!(provider, error = %source, "Provider request failed");
        ProviderError::Http { provider, source }
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ProviderError::Http { provider, source })?;

    if !status.is_success() {
        tracing::error!(provider, %status, body = %body, "Provider returned an error status");
        return Err(ProviderError::Status { provider, status, body });
    }
    Ok(body)
}

pub(crate) fn decode<T: DeserializeOwned>(provider: &'static str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|source| {
        tracing::error!(provider, error = %source, "Provider response could not be decoded");
        ProviderError::Decode { provider, source }
    })
}
