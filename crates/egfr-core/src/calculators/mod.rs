//! eGFR formula calculators.
//!
//! Each formula is a pure function of a [`CalculatorInput`]. The formulas are a
//! closed set: [`CalculatorKind`] names them and dispatches to the
//! implementation, so callers select a formula by name and never need to know
//! which struct does the arithmetic.

mod ckd_epi;
mod cockcroft_gault;

pub use ckd_epi::*;
pub use cockcroft_gault::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CreatinineUnits, Ethnicity, Gender};

/// µmol/L per mg/dL of serum creatinine.
pub const CREATININE_UMOL_PER_MG_DL: f64 = 88.4;

/// Calculator errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EgfrCalculatorError {
    #[error("Unable to calculate egfr_value with {calculator}. Insufficient information: missing {missing:?}")]
    InsufficientInformation {
        calculator: &'static str,
        missing: Vec<&'static str>,
    },

    #[error("Unable to calculate egfr_value with {calculator}. {field} out of range: {value}")]
    OutOfRange {
        calculator: &'static str,
        field: &'static str,
        value: f64,
    },
}

pub type CalculatorResult<T> = Result<T, EgfrCalculatorError>;

/// Inputs to an eGFR formula.
///
/// Every field is optional; each formula checks the ones it needs. A
/// non-positive number counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatorInput {
    pub gender: Option<Gender>,
    pub ethnicity: Option<Ethnicity>,
    pub age_in_years: Option<u32>,
    pub weight_kg: Option<f64>,
    pub creatinine_value: Option<f64>,
    pub creatinine_units: Option<CreatinineUnits>,
}

impl CalculatorInput {
    pub(crate) fn age(&self) -> Option<u32> {
        self.age_in_years.filter(|a| *a > 0)
    }

    pub(crate) fn weight(&self) -> Option<f64> {
        self.weight_kg.filter(|w| *w > 0.0)
    }

    /// Serum creatinine in mg/dL, converting from µmol/L if needed.
    pub(crate) fn creatinine_mg_dl(&self) -> Option<f64> {
        let value = self.creatinine_value.filter(|v| *v > 0.0)?;
        match self.creatinine_units? {
            CreatinineUnits::MilligramsPerDeciliter => Some(value),
            CreatinineUnits::MicromolesPerLiter => Some(umol_to_mg_dl(value)),
        }
    }

    /// Serum creatinine in µmol/L, only if it was reported in µmol/L.
    pub(crate) fn creatinine_umol_l(&self) -> Option<f64> {
        match self.creatinine_units? {
            CreatinineUnits::MicromolesPerLiter => self.creatinine_value.filter(|v| *v > 0.0),
            CreatinineUnits::MilligramsPerDeciliter => None,
        }
    }
}

/// Convert serum creatinine from µmol/L to mg/dL.
pub fn umol_to_mg_dl(value: f64) -> f64 {
    value / CREATININE_UMOL_PER_MG_DL
}

/// An eGFR formula.
pub trait EgfrCalculator {
    /// Registry name, e.g. "ckd-epi".
    fn name(&self) -> &'static str;

    /// Unit label of the value returned by [`EgfrCalculator::calculate`].
    fn units(&self) -> &'static str;

    /// Compute the value or fail if a required input is missing.
    fn calculate(&self, input: &CalculatorInput) -> CalculatorResult<f64>;
}

/// The known formulas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CalculatorKind {
    CkdEpi,
    CockcroftGault,
}

impl CalculatorKind {
    pub const ALL: [CalculatorKind; 2] = [CalculatorKind::CkdEpi, CalculatorKind::CockcroftGault];

    /// Names accepted by [`CalculatorKind::from_str`].
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.name()).collect()
    }

    fn calculator(&self) -> &'static dyn EgfrCalculator {
        match self {
            CalculatorKind::CkdEpi => &CkdEpi,
            CalculatorKind::CockcroftGault => &CockcroftGault,
        }
    }

    pub fn name(&self) -> &'static str {
        self.calculator().name()
    }

    pub fn units(&self) -> &'static str {
        self.calculator().units()
    }

    pub fn calculate(&self, input: &CalculatorInput) -> CalculatorResult<f64> {
        let value = self.calculator().calculate(input)?;
        tracing::debug!(calculator = self.name(), value, "calculated egfr value");
        Ok(value)
    }
}

impl FromStr for CalculatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for CalculatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relative decline from `baseline` to `current`, in percent.
///
/// Positive means `current` is lower than `baseline`. Undefined for a zero
/// baseline; callers must not pass one.
pub fn percent_change(current: f64, baseline: f64) -> f64 {
    (baseline - current) / baseline * 100.0
}
