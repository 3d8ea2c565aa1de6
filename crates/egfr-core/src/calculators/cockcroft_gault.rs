//! Cockcroft-Gault creatinine clearance.
//!
//! ```text
//! CrCl (mL/min) = (140 - age) × weight (kg) × constant / Scr (µmol/L)
//! ```
//!
//! The constant is 1.23 for males and 1.05 for females. Creatinine must be
//! reported in µmol/L; no unit conversion is applied.
//! Ages above 140 would give a negative clearance and are rejected.

use super::{CalculatorInput, CalculatorResult, EgfrCalculator, EgfrCalculatorError};
use crate::models::{Gender, CRCL_UNITS};

const AGE_OFFSET: f64 = 140.0;

/// Cockcroft-Gault creatinine clearance in mL/min.
#[derive(Debug, Clone, Copy, Default)]
pub struct CockcroftGault;

impl CockcroftGault {
    fn gender_factor(gender: Gender) -> f64 {
        match gender {
            Gender::Female => 1.05,
            Gender::Male => 1.23,
        }
    }
}

impl EgfrCalculator for CockcroftGault {
    fn name(&self) -> &'static str {
        "cockcroft-gault"
    }

    fn units(&self) -> &'static str {
        CRCL_UNITS
    }

    fn calculate(&self, input: &CalculatorInput) -> CalculatorResult<f64> {
        match (input.gender, input.age(), input.weight(), input.creatinine_umol_l()) {
            (Some(_), Some(age), Some(_), Some(_)) if age as f64 > AGE_OFFSET => {
                Err(EgfrCalculatorError::OutOfRange {
                    calculator: self.name(),
                    field: "age_in_years",
                    value: age as f64,
                })
            }
            (Some(gender), Some(age), Some(weight), Some(scr)) => {
                Ok((AGE_OFFSET - age as f64) * weight * Self::gender_factor(gender) / scr)
            }
            (gender, age, weight, scr) => {
                let missing = [
                    ("gender", gender.is_none()),
                    ("age_in_years", age.is_none()),
                    ("weight_kg", weight.is_none()),
                    ("creatinine_umol_l", scr.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(EgfrCalculatorError::InsufficientInformation {
                    calculator: self.name(),
                    missing,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreatinineUnits;

    fn input(gender: Gender, age: u32, weight: f64, scr: f64) -> CalculatorInput {
        CalculatorInput {
            gender: Some(gender),
            age_in_years: Some(age),
            weight_kg: Some(weight),
            creatinine_value: Some(scr),
            creatinine_units: Some(CreatinineUnits::MicromolesPerLiter),
            ..Default::default()
        }
    }

    #[test]
    fn test_male() {
        let value = CockcroftGault.calculate(&input(Gender::Male, 40, 70.0, 90.0)).unwrap();
        assert!((value - 95.666_666).abs() < 1e-4);
    }

    #[test]
    fn test_female() {
        let value = CockcroftGault.calculate(&input(Gender::Female, 60, 55.0, 70.0)).unwrap();
        assert!((value - 80.0 * 55.0 * 1.05 / 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_requires_weight() {
        let mut inp = input(Gender::Male, 40, 70.0, 90.0);
        inp.weight_kg = None;
        let err = CockcroftGault.calculate(&inp).unwrap_err();
        assert_eq!(
            err,
            EgfrCalculatorError::InsufficientInformation {
                calculator: "cockcroft-gault",
                missing: vec!["weight_kg"],
            }
        );
    }

    #[test]
    fn test_age_above_offset_is_out_of_range() {
        assert_eq!(CockcroftGault.calculate(&input(Gender::Male, 140, 70.0, 90.0)).unwrap(), 0.0);

        let err = CockcroftGault.calculate(&input(Gender::Male, 141, 70.0, 90.0)).unwrap_err();
        assert_eq!(
            err,
            EgfrCalculatorError::OutOfRange {
                calculator: "cockcroft-gault",
                field: "age_in_years",
                value: 141.0,
            }
        );
    }

    #[test]
    fn test_mg_dl_is_not_converted() {
        let mut inp = input(Gender::Male, 40, 70.0, 1.1);
        inp.creatinine_units = Some(CreatinineUnits::MilligramsPerDeciliter);
        assert!(CockcroftGault.calculate(&inp).is_err());
    }
}
