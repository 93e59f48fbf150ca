use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::ordinal_cmp;

/// One object found by the food detection server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "Food_name")]
    pub food_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_confidence: Option<f64>,
}

impl Detection {
    pub fn named(food_name: impl Into<String>) -> Self {
        Self { food_name: food_name.into(), highest_confidence: None }
    }
}

/// Detection server output in provider order.
///
/// Accepts both a JSON list and the `{"item1": {...}, "item2": {...}}` object
/// the inference server emits; always serializes as a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DetectionsRepr", into = "Vec<Detection>")]
pub struct Detections(pub Vec<Detection>);

#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionsRepr {
    List(Vec<Detection>),
    Keyed(BTreeMap<String, Detection>),
}

impl From<DetectionsRepr> for Detections {
    fn from(repr: DetectionsRepr) -> Self {
        match repr {
            DetectionsRepr::List(list) => Detections(list),
            DetectionsRepr::Keyed(map) => {
                let mut entries: Vec<(String, Detection)> = map.into_iter().collect();
                entries.sort_by(|a, b| ordinal_cmp(&a.0, &b.0));
                Detections(entries.into_iter().map(|(_, d)| d).collect())
            }
        }
    }
}

impl From<Detections> for Vec<Detection> {
    fn from(d: Detections) -> Self {
        d.0
    }
}

impl Detections {
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
