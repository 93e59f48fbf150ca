use std::path::{Path, PathBuf};

use mealscan_core::ScanResult;
use thiserror::Error;

use crate::config::{ConfigError, RunConfig};
use crate::preprocess::{self, ResizeOutcome, ResizePolicy};
use crate::providers::{
    ClovaOcr, DetectionServer, FoodDetector, FoodRecognizer, ImageUpload, KtFood, ProviderError,
    ReceiptReader,
};
use crate::secrets::Secrets;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("OCR failed: {0}")]
    Ocr(#[source] ProviderError),
    #[error("Food recognition failed: {0}")]
    FoodRecognition(#[source] ProviderError),
    #[error("Object detection failed: {0}")]
    Detection(#[source] ProviderError),
    #[error("Malformed provider response: {0}")]
    Malformed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub resize: ResizePolicy,
    /// A failed food-recognition call contributes no regions instead of
    /// aborting the scan.
    pub tolerate_food_failure: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { resize: ResizePolicy::default(), tolerate_food_failure: true }
    }
}

impl From<&RunConfig> for ScanOptions {
    fn from(config: &RunConfig) -> Self {
        Self { resize: config.resize.policy(), tolerate_food_failure: config.food.tolerate_failure }
    }
}

/// Orchestrates: OCR → (receipt text | resize → food ∥ detection → merge).
pub struct ScanPipeline<R, F, D> {
    reader: R,
    recognizer: F,
    detector: D,
    options: ScanOptions,
}

/// The pipeline wired to the real HTTP providers.
pub type HttpScanPipeline = ScanPipeline<ClovaOcr, KtFood, DetectionServer>;

impl HttpScanPipeline {
    pub fn from_config(config: &RunConfig, secrets: &Secrets) -> Result<Self, ConfigError> {
        let timeout = config.timeout();
        Ok(ScanPipeline::new(
            ClovaOcr::from_secrets(secrets, timeout)?,
            KtFood::from_secrets(secrets, timeout)?.with_flag(config.food.flag),
            DetectionServer::from_secrets(secrets, timeout)?,
            ScanOptions::from(config),
        ))
    }
}

impl<R, F, D> ScanPipeline<R, F, D>
where
    R: ReceiptReader,
    F: FoodRecognizer,
    D: FoodDetector,
{
    pub fn new(reader: R, recognizer: F, detector: D, options: ScanOptions) -> Self {
        Self { reader, recognizer, detector, options }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn recognizer(&self) -> &F {
        &self.recognizer
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Scan an image on disk. On the food-scene branch the file is resized in
    /// place before it is uploaded again.
    pub async fn scan_file(&self, path: &Path) -> Result<ScanResult, PipelineError> {
        let upload = ImageUpload::from_path(path).await?;
        if let Some(receipt) = self.read_receipt(&upload).await? {
            return Ok(receipt);
        }

        let upload = match preprocess::resize_in_place(path, self.options.resize).await {
            Ok(ResizeOutcome::Resized { .. }) => ImageUpload::from_path(path).await?,
            Ok(ResizeOutcome::Unchanged) => upload,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Resize failed; uploading original image");
                upload
            }
        };
        self.scan_scene(&upload).await
    }

    /// Scan an image held in memory (e.g. an HTTP upload). The resize happens
    /// on a copy; the caller's bytes are untouched.
    pub async fn scan_bytes(&self, upload: ImageUpload) -> Result<ScanResult, PipelineError> {
        if let Some(receipt) = self.read_receipt(&upload).await? {
            return Ok(receipt);
        }

        let policy = self.options.resize;
        let original = upload.bytes.clone();
        let resized = tokio::task::spawn_blocking(move || preprocess::resize_bytes(&original, policy)).await;
        let upload = match resized {
            Ok(Ok(Some((bytes, outcome)))) => {
                tracing::info!(outcome = ?outcome, "Resized uploaded image");
                ImageUpload { bytes, ..upload }
            }
            Ok(Ok(None)) => upload,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Resize failed; uploading original image");
                upload
            }
            Err(e) => {
                tracing::warn!(error = %e, "Resize task failed; uploading original image");
                upload
            }
        };
        self.scan_scene(&upload).await
    }

    /// Run OCR. `Some` when the image is a receipt, `None` when the scan should
    /// continue down the food-scene branch.
    async fn read_receipt(&self, upload: &ImageUpload) -> Result<Option<ScanResult>, PipelineError> {
        let ocr = self.reader.read(upload).await.map_err(PipelineError::Ocr)?;
        let image = ocr
            .first_image()
            .ok_or_else(|| PipelineError::Malformed("OCR response has no images".to_string()))?;

        if image.is_receipt() {
            let result = ScanResult::from_receipt(image);
            tracing::info!(items = result.predict.food_names.len(), "Receipt recognized");
            Ok(Some(result))
        } else {
            tracing::info!(verdict = %image.infer_result, "Not a receipt; identifying food");
            Ok(None)
        }
    }

    async fn scan_scene(&self, upload: &ImageUpload) -> Result<ScanResult, PipelineError> {
        let (food, detections) =
            tokio::join!(self.recognizer.recognize(upload), self.detector.detect(upload));

        let food = match food {
            Ok(data) => Some(data),
            Err(e) if self.options.tolerate_food_failure => {
                tracing::warn!(error = %e, "Food recognition failed; continuing with detections only");
                None
            }
            Err(e) => return Err(PipelineError::FoodRecognition(e)),
        };
        let detections = detections.map_err(PipelineError::Detection)?;

        let result = ScanResult::from_scene(food.as_ref(), &detections);
        tracing::info!(foods = result.predict.food_names.len(), "Food scene identified");
        Ok(result)
    }
}

/// Write the result as pretty JSON to `output`, or to stdout when `None`.
///
/// File output goes through a per-call temp file renamed over `output`, so
/// concurrent writers to the same path each leave a complete document.
pub async fn write_result(result: &ScanResult, output: Option<&Path>) -> Result<(), PipelineError> {
    let json = result.to_pretty_json()?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let temp = result_temp_path(path);
            if let Err(e) = preprocess::write_then_rename(&temp, path, json.as_bytes()).await {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(e.into());
            }
            tracing::info!(path = %path.display(), "Result saved");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn result_temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result.json".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
