use std::sync::Mutex;

use async_trait::async_trait;
use mealscan_core::{Detections, FoodData, OcrResponse};
use reqwest::StatusCode;

use super::{FoodDetector, FoodRecognizer, ImageUpload, ProviderError, ReceiptReader};

// ── Mock providers (always available, used for tests) ────────────────────────
//
// Each returns a preset response, or a 500 status error when constructed with
// `failing()`, and records the last image it was handed.

fn failure(provider: &'static str) -> ProviderError {
    ProviderError::Status {
        provider,
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "mock failure".to_string(),
    }
}

fn remember(slot: &Mutex<Option<ImageUpload>>, image: &ImageUpload) {
    if let Ok(mut last) = slot.lock() {
        *last = Some(image.clone());
    }
}

fn recall(slot: &Mutex<Option<ImageUpload>>) -> Option<ImageUpload> {
    slot.lock().ok().and_then(|last| last.clone())
}

#[derive(Default)]
pub struct MockReader {
    response: Option<OcrResponse>,
    last: Mutex<Option<ImageUpload>>,
}

impl MockReader {
    pub fn new(response: OcrResponse) -> Self {
        Self { response: Some(response), last: Mutex::new(None) }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn last_image(&self) -> Option<ImageUpload> {
        recall(&self.last)
    }
}

#[async_trait]
impl ReceiptReader for MockReader {
    async fn read(&self, image: &ImageUpload) -> Result<OcrResponse, ProviderError> {
        remember(&self.last, image);
        self.response.clone().ok_or_else(|| failure("ocr"))
    }
}

#[derive(Default)]
pub struct MockRecognizer {
    data: Option<FoodData>,
    last: Mutex<Option<ImageUpload>>,
}

impl MockRecognizer {
    pub fn new(data: FoodData) -> Self {
        Self { data: Some(data), last: Mutex::new(None) }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn last_image(&self) -> Option<ImageUpload> {
        recall(&self.last)
    }
}

#[async_trait]
impl FoodRecognizer for MockRecognizer {
    async fn recognize(&self, image: &ImageUpload) -> Result<FoodData, ProviderError> {
        remember(&self.last, image);
        self.data.clone().ok_or_else(|| failure("food"))
    }
}

#[derive(Default)]
pub struct MockDetector {
    detections: Option<Detections>,
    last: Mutex<Option<ImageUpload>>,
}

impl MockDetector {
    pub fn new(detections: Detections) -> Self {
        Self { detections: Some(detections), last: Mutex::new(None) }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn last_image(&self) -> Option<ImageUpload> {
        recall(&self.last)
    }
}

#[async_trait]
impl FoodDetector for MockDetector {
    async fn detect(&self, image: &ImageUpload) -> Result<Detections, ProviderError> {
        remember(&self.last, image);
        self.detections.clone().ok_or_else(|| failure("detection"))
    }
}
