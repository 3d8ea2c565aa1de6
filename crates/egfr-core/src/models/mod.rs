//! Domain models for the eGFR engine.

mod context;
mod demographics;
mod notification;
mod report;

pub use context::*;
pub use demographics::*;
pub use notification::*;
pub use report::*;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while building domain values from raw input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown {kind}: {code}")]
    UnknownCode { kind: &'static str, code: String },

    #[error("Date of birth {dob} is after reference date {reference}")]
    InvalidDateOfBirth { dob: NaiveDate, reference: NaiveDate },

    #[error("Age out of range: {0}")]
    AgeOutOfRange(u32),
}

pub type ModelResult<T> = Result<T, ModelError>;
