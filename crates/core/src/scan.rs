use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detection::Detections;
use crate::food::{regions_in_order, FoodData, Prediction};
use crate::ocr::OcrImage;

/// Which branch produced a [`ScanResult`]. Serialized as `0` / `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum InferKind {
    /// Text read off a receipt by the OCR provider.
    #[default]
    Receipt,
    /// Food names from the recognition and detection providers.
    FoodScene,
}

impl From<InferKind> for u8 {
    fn from(kind: InferKind) -> u8 {
        match kind {
            InferKind::Receipt => 0,
            InferKind::FoodScene => 1,
        }
    }
}

impl TryFrom<u8> for InferKind {
    type Error = String;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(InferKind::Receipt),
            1 => Ok(InferKind::FoodScene),
            other => Err(format!("Unknown inferResult: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predict {
    #[serde(rename = "foodNames")]
    pub food_names: Vec<String>,
    /// Top-1 prediction per region, keyed by region. Written in numeric key
    /// order, matching `food_names`.
    #[serde(rename = "ktFoodsInfo", serialize_with = "crate::util::serialize_by_ordinal")]
    pub kt_foods_info: BTreeMap<String, Prediction>,
}

/// The aggregated record written once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(rename = "inferResult")]
    pub kind: InferKind,
    pub predict: Predict,
}

impl ScanResult {
    pub fn from_receipt(image: &OcrImage) -> Self {
        Self {
            kind: InferKind::Receipt,
            predict: Predict { food_names: image.item_texts(), kt_foods_info: BTreeMap::new() },
        }
    }

    /// Merge food-recognition regions and detections. Region names come first
    /// (in region order), then detection names (in provider order). `None`
    /// for `food` means the recognition call contributed nothing.
    pub fn from_scene(food: Option<&FoodData>, detections: &Detections) -> Self {
        let mut predict = Predict::default();

        if let Some(data) = food {
            for (region, info) in regions_in_order(data) {
                predict
                    .kt_foods_info
                    .insert(region.to_string(), info.prediction_top1.clone());
                predict.food_names.push(info.prediction_top1.food_name.clone());
            }
        }

        predict
            .food_names
            .extend(detections.iter().map(|d| d.food_name.clone()));

        Self { kind: InferKind::FoodScene, predict }
    }

    /// Receipt lines, each terminated by `\n`. Empty for food scenes.
    pub fn receipt_text(&self) -> String {
        if self.kind != InferKind::Receipt {
            return String::new();
        }
        self.predict
            .food_names
            .iter()
            .fold(String::new(), |mut acc, line| {
                acc.push_str(line);
                acc.push('\n');
                acc
            })
    }

    /// Pretty JSON with 4-space indentation; non-ASCII text is written as-is.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only ever emits valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::food::{FoodRegion, RegionMap};
    use crate::ocr::OcrResponse;
    use serde_json::json;

    fn food_with(regions: &[(&str, &str)]) -> FoodData {
        let mut map = RegionMap::new();
        for (key, name) in regions {
            map.insert(
                key.to_string(),
                FoodRegion { prediction_top1: Prediction::named(*name), prediction_top5: vec![] },
            );
        }
        vec![map]
    }

    #[test]
    fn receipt_branch_renders_newline_terminated_text() {
        let ocr: OcrResponse = serde_json::from_value(json!({
            "images": [{
                "inferResult": "SUCCESS",
                "receipt": { "result": { "subResults": [
                    { "items": [ { "name": { "text": "Apple" } }, { "name": { "text": "Bread" } } ] }
                ] } }
            }]
        }))
        .unwrap();
        let result = ScanResult::from_receipt(ocr.first_image().unwrap());
        assert_eq!(result.kind, InferKind::Receipt);
        assert_eq!(result.receipt_text(), "Apple\nBread\n");
        assert!(result.predict.kt_foods_info.is_empty());
    }

    #[test]
    fn scene_merges_regions_then_detections() {
        let food = food_with(&[("0", "Pizza")]);
        let detections = Detections(vec![Detection::named("Salad")]);
        let result = ScanResult::from_scene(Some(&food), &detections);

        assert_eq!(result.kind, InferKind::FoodScene);
        assert_eq!(result.predict.food_names, vec!["Pizza", "Salad"]);
        assert_eq!(
            serde_json::to_value(&result.predict.kt_foods_info).unwrap(),
            json!({ "0": { "food_name": "Pizza" } })
        );
        assert_eq!(result.receipt_text(), "");
    }

    #[test]
    fn scene_without_food_contribution_keeps_detections() {
        let detections = Detections(vec![Detection::named("Salad"), Detection::named("Soup")]);
        let result = ScanResult::from_scene(None, &detections);
        assert_eq!(result.predict.food_names, vec!["Salad", "Soup"]);
        assert!(result.predict.kt_foods_info.is_empty());
    }

    #[test]
    fn scene_region_names_in_numeric_order() {
        let food = food_with(&[("10", "Tteok"), ("2", "Bibimbap"), ("0", "Kimchi")]);
        let result = ScanResult::from_scene(Some(&food), &Detections::default());
        assert_eq!(result.predict.food_names, vec!["Kimchi", "Bibimbap", "Tteok"]);
    }

    #[test]
    fn kt_foods_info_keys_written_in_numeric_order() {
        let food = food_with(&[("10", "Tteok"), ("2", "Bibimbap"), ("0", "Kimchi")]);
        let result = ScanResult::from_scene(Some(&food), &Detections::default());
        let text = serde_json::to_string(&result).unwrap();

        let at = |key: &str| text.find(&format!("\"{key}\":{{")).unwrap();
        assert!(at("0") < at("2"));
        assert!(at("2") < at("10"));
    }

    #[test]
    fn serialized_shape_matches_output_contract() {
        let food = food_with(&[("0", "김치찌개")]);
        let result = ScanResult::from_scene(Some(&food), &Detections::default());
        let text = result.to_pretty_json().unwrap();

        assert!(text.contains("\n    \"inferResult\": 1"));
        assert!(text.contains("김치찌개"));
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            back,
            json!({
                "inferResult": 1,
                "predict": { "foodNames": ["김치찌개"], "ktFoodsInfo": { "0": { "food_name": "김치찌개" } } }
            })
        );
    }

    #[test]
    fn infer_kind_rejects_unknown_discriminator() {
        assert!(serde_json::from_value::<InferKind>(json!(7)).is_err());
        assert_eq!(serde_json::from_value::<InferKind>(json!(1)).unwrap(), InferKind::FoodScene);
    }
}
