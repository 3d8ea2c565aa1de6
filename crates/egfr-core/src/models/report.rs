//! Values an evaluation hands back to the lab-result record.

use serde::{Deserialize, Serialize};

/// Decimal places stored for eGFR and eGFR-drop values.
pub const RESULT_DECIMAL_PLACES: i32 = 4;

/// Result fields ready to be persisted on a lab-result record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EgfrReport {
    pub egfr_value: f64,
    pub egfr_units: String,
    pub egfr_grade: Option<u8>,
    pub egfr_drop_value: f64,
    pub egfr_drop_units: String,
    pub egfr_drop_grade: Option<u8>,
}

/// Round to the stored precision.
pub fn round_result(value: f64) -> f64 {
    let factor = 10f64.powi(RESULT_DECIMAL_PLACES);
    (value * factor).round() / factor
}
