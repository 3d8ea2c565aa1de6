//! CKD-EPI creatinine equation (2009).
//!
//! ```text
//! GFR = 141 × min(Scr/κ, 1)^α × max(Scr/κ, 1)^-1.209 × 0.993^Age
//!           × 1.018 [if female] × 1.159 [if Black]
//! ```
//!
//! Scr is serum creatinine in mg/dL, κ is 0.7 for females and 0.9 for males,
//! α is -0.329 for females and -0.411 for males.

use super::{CalculatorInput, CalculatorResult, EgfrCalculator, EgfrCalculatorError};
use crate::models::{Gender, EGFR_UNITS};

const BASE: f64 = 141.0;
const MAX_EXPONENT: f64 = -1.209;
const AGE_FACTOR: f64 = 0.993;
const FEMALE_FACTOR: f64 = 1.018;
const BLACK_FACTOR: f64 = 1.159;

/// CKD-EPI eGFR in mL/min/1.73 m².
#[derive(Debug, Clone, Copy, Default)]
pub struct CkdEpi;

impl CkdEpi {
    fn kappa(gender: Gender) -> f64 {
        match gender {
            Gender::Female => 0.7,
            Gender::Male => 0.9,
        }
    }

    fn alpha(gender: Gender) -> f64 {
        match gender {
            Gender::Female => -0.329,
            Gender::Male => -0.411,
        }
    }
}

impl EgfrCalculator for CkdEpi {
    fn name(&self) -> &'static str {
        "ckd-epi"
    }

    fn units(&self) -> &'static str {
        EGFR_UNITS
    }

    fn calculate(&self, input: &CalculatorInput) -> CalculatorResult<f64> {
        let (Some(gender), Some(age), Some(scr)) =
            (input.gender, input.age(), input.creatinine_mg_dl())
        else {
            let mut missing = Vec::new();
            if input.gender.is_none() {
                missing.push("gender");
            }
            if input.age().is_none() {
                missing.push("age_in_years");
            }
            if input.creatinine_mg_dl().is_none() {
                missing.push("creatinine");
            }
            return Err(EgfrCalculatorError::InsufficientInformation {
                calculator: self.name(),
                missing,
            });
        };

        let ratio = scr / Self::kappa(gender);
        let mut value = BASE
            * ratio.min(1.0).powf(Self::alpha(gender))
            * ratio.max(1.0).powf(MAX_EXPONENT)
            * AGE_FACTOR.powi(age as i32);

        if gender == Gender::Female {
            value *= FEMALE_FACTOR;
        }
        if input.ethnicity.is_some_and(|e| e.is_black()) {
            value *= BLACK_FACTOR;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreatinineUnits, Ethnicity};

    fn input(gender: Gender, age: u32, scr: f64, units: CreatinineUnits) -> CalculatorInput {
        CalculatorInput {
            gender: Some(gender),
            ethnicity: Some(Ethnicity::Black),
            age_in_years: Some(age),
            creatinine_value: Some(scr),
            creatinine_units: Some(units),
            ..Default::default()
        }
    }

    #[test]
    fn test_male_black_mg_dl() {
        let value = CkdEpi
            .calculate(&input(Gender::Male, 25, 10.15, CreatinineUnits::MilligramsPerDeciliter))
            .unwrap();
        assert_eq!((value * 100.0).round() / 100.0, 7.33);
    }

    #[test]
    fn test_male_black_umol_l() {
        let value = CkdEpi
            .calculate(&input(Gender::Male, 30, 53.0, CreatinineUnits::MicromolesPerLiter))
            .unwrap();
        assert!((value - 156.42).abs() < 0.01);

        let value = CkdEpi
            .calculate(&input(Gender::Male, 30, 275.0, CreatinineUnits::MicromolesPerLiter))
            .unwrap();
        assert!((value - 29.55).abs() < 0.01);
    }

    #[test]
    fn test_female_uses_female_coefficients() {
        // Scr below κ for a female: only the α term applies.
        let mut inp = input(Gender::Female, 40, 0.6, CreatinineUnits::MilligramsPerDeciliter);
        inp.ethnicity = Some(Ethnicity::Caucasian);
        let expected = 141.0 * (0.6f64 / 0.7).powf(-0.329) * 0.993f64.powi(40) * 1.018;
        let value = CkdEpi.calculate(&inp).unwrap();
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_missing_ethnicity_is_non_black() {
        let mut inp = input(Gender::Male, 50, 1.2, CreatinineUnits::MilligramsPerDeciliter);
        let black = CkdEpi.calculate(&inp).unwrap();
        inp.ethnicity = None;
        let other = CkdEpi.calculate(&inp).unwrap();
        assert!((black / other - BLACK_FACTOR).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_information() {
        let err = CkdEpi
            .calculate(&CalculatorInput {
                gender: Some(Gender::Male),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            EgfrCalculatorError::InsufficientInformation {
                calculator: "ckd-epi",
                missing: vec!["age_in_years", "creatinine"],
            }
        );
    }
}
