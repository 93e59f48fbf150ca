use serde::{Deserialize, Serialize};

/// `inferResult` value the OCR provider reports when the image is not a
/// parseable receipt.
pub const NOT_A_RECEIPT: &str = "ERROR";

/// Top-level OCR response. Only the fields the scanner reads are modelled;
/// everything else in the provider payload is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResponse {
    #[serde(default)]
    pub images: Vec<OcrImage>,
}

impl OcrResponse {
    /// The first (and in practice only) image result.
    pub fn first_image(&self) -> Option<&OcrImage> {
        self.images.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrImage {
    #[serde(rename = "inferResult")]
    pub infer_result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
}

impl OcrImage {
    pub fn is_receipt(&self) -> bool {
        self.infer_result != NOT_A_RECEIPT
    }

    /// Item texts of the first sub-result, in order. Empty when the receipt
    /// has no sub-results or the provider omitted the receipt block.
    pub fn item_texts(&self) -> Vec<String> {
        self.receipt
            .as_ref()
            .and_then(|r| r.result.sub_results.first())
            .map(|sub| {
                sub.items
                    .iter()
                    .filter_map(|item| item.name.as_ref().map(|n| n.text.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub result: ReceiptResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptResult {
    #[serde(rename = "subResults", default)]
    pub sub_results: Vec<SubResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubResult {
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<TextField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextField {
    pub text: String,
}
