//! Demographic and laboratory value types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ModelError, ModelResult};

/// eGFR unit label (CKD-EPI, normalised to body surface area).
pub const EGFR_UNITS: &str = "mL/min/1.73 m2";
/// Creatinine clearance unit label (Cockcroft-Gault).
pub const CRCL_UNITS: &str = "mL/min";
/// Percentage unit label used for eGFR drop values.
pub const PERCENT: &str = "%";

/// Patient gender as recorded on the registered subject.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Single-letter code ("M" / "F").
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl FromStr for Gender {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Ok(Gender::Male),
            "f" | "female" => Ok(Gender::Female),
            _ => Err(ModelError::UnknownCode {
                kind: "gender",
                code: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Ethnicity. Only the Black / non-Black distinction affects CKD-EPI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Ethnicity {
    Black,
    Asian,
    Caucasian,
    Other,
}

impl Ethnicity {
    pub fn code(&self) -> &'static str {
        match self {
            Ethnicity::Black => "black",
            Ethnicity::Asian => "asian",
            Ethnicity::Caucasian => "caucasian",
            Ethnicity::Other => "other",
        }
    }

    pub fn is_black(&self) -> bool {
        matches!(self, Ethnicity::Black)
    }
}

impl FromStr for Ethnicity {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "black" => Ok(Ethnicity::Black),
            "asian" => Ok(Ethnicity::Asian),
            "caucasian" | "white" => Ok(Ethnicity::Caucasian),
            "other" => Ok(Ethnicity::Other),
            _ => Err(ModelError::UnknownCode {
                kind: "ethnicity",
                code: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Ethnicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Units a serum creatinine result can be reported in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CreatinineUnits {
    /// µmol/L
    MicromolesPerLiter,
    /// mg/dL
    MilligramsPerDeciliter,
}

impl CreatinineUnits {
    pub fn code(&self) -> &'static str {
        match self {
            CreatinineUnits::MicromolesPerLiter => "umol/L",
            CreatinineUnits::MilligramsPerDeciliter => "mg/dL",
        }
    }
}

impl FromStr for CreatinineUnits {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "umol/l" | "µmol/l" | "micromoles_per_liter" => Ok(CreatinineUnits::MicromolesPerLiter),
            "mg/dl" | "milligrams_per_deciliter" => Ok(CreatinineUnits::MilligramsPerDeciliter),
            _ => Err(ModelError::UnknownCode {
                kind: "creatinine units",
                code: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CreatinineUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Age in whole years at `reference`.
///
/// Fails if the date of birth is after the reference date.
pub fn age_in_years(dob: NaiveDate, reference: DateTime<Utc>) -> ModelResult<u32> {
    let on = reference.date_naive();
    if dob > on {
        return Err(ModelError::InvalidDateOfBirth { dob, reference: on });
    }
    let mut years = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    Ok(years as u32)
}

/// Date of birth implied by an age at `reference`.
pub fn dob_from_age(age_in_years: u32, reference: DateTime<Utc>) -> ModelResult<NaiveDate> {
    reference
        .date_naive()
        .checked_sub_months(Months::new(age_in_years.saturating_mul(12)))
        .ok_or(ModelError::AgeOutOfRange(age_in_years))
}
