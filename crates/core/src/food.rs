use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::ordinal_cmp;

/// One entry of the food provider's `data` array: region key → region.
pub type RegionMap = BTreeMap<String, FoodRegion>;

/// The food provider's `data` field.
pub type FoodData = Vec<RegionMap>;

/// Full food-recognition response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodResponse {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub data: FoodData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRegion {
    pub prediction_top1: Prediction,
    /// Ranked alternatives; shape varies by provider flag, kept as raw JSON.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prediction_top5: Vec<serde_json::Value>,
}

/// A single classification. `food_name` is always present; nutrition and
/// confidence fields depend on the requested flag and are carried through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub food_name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Prediction {
    pub fn named(food_name: impl Into<String>) -> Self {
        Self { food_name: food_name.into(), extra: serde_json::Map::new() }
    }
}

/// Regions of the first `data` entry, ordered by region number.
pub fn regions_in_order(data: &FoodData) -> Vec<(&str, &FoodRegion)> {
    let Some(first) = data.first() else {
        return Vec::new();
    };
    let mut regions: Vec<(&str, &FoodRegion)> =
        first.iter().map(|(k, v)| (k.as_str(), v)).collect();
    regions.sort_by(|a, b| ordinal_cmp(a.0, b.0));
    regions
}
