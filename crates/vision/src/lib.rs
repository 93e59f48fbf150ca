pub mod config;
pub mod pipeline;
pub mod preprocess;
pub mod providers;
pub mod secrets;
pub mod sign;

pub use config::{ConfigError, FoodConfig, ResizeConfig, ResizeMode, RunConfig, ServerConfig};
pub use pipeline::{write_result, HttpScanPipeline, PipelineError, ScanOptions, ScanPipeline};
pub use preprocess::{
    resize_bytes, resize_in_place, target_size, ResizeError, ResizeOutcome, ResizePolicy, MAX_RESIZE_PIXELS,
};
pub use providers::{
    ClovaOcr, DetectionServer, FoodDetector, FoodFlag, FoodRecognizer, ImageUpload, KtFood,
    MockDetector, MockReader, MockRecognizer, ProviderError, ReceiptReader,
};
pub use secrets::Secrets;
pub use sign::{auth_timestamp, sign};
