pub mod detection;
pub mod food;
pub mod ocr;
pub mod scan;
pub(crate) mod util;

pub use detection::{Detection, Detections};
pub use food::{regions_in_order, FoodData, FoodRegion, FoodResponse, Prediction, RegionMap};
pub use ocr::{OcrImage, OcrResponse, ReceiptItem, NOT_A_RECEIPT};
pub use scan::{InferKind, Predict, ScanResult};
