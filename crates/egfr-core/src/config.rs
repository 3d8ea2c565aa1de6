//! Site-level eGFR settings.

use serde::{Deserialize, Serialize};

use crate::grading::DAIDS_JULY_2017;

/// Defaults applied when a request leaves the formula, threshold or
/// reference-range collection unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EgfrSettings {
    /// Formula name, one of the [`crate::calculators::CalculatorKind`] names
    pub formula_name: String,
    /// Percent drop from baseline that raises a notification; `None` disables
    pub percent_drop_threshold: Option<f64>,
    /// Reference-range collection used for grading
    pub reference_range_collection_name: String,
}

impl Default for EgfrSettings {
    fn default() -> Self {
        Self {
            formula_name: "ckd-epi".to_string(),
            percent_drop_threshold: Some(20.0),
            reference_range_collection_name: DAIDS_JULY_2017.to_string(),
        }
    }
}

impl EgfrSettings {
    /// Parse settings from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
