//! Reference-range grading.
//!
//! The engine only talks to the two traits in this module: a
//! [`ReferenceRangeLookup`] resolves a collection by name, and the returned
//! [`GradingGroup`] grades a value for one metric. [`SiteReportables`] and
//! [`ReferenceRangeCollection`] are the in-memory implementation, with the
//! DAIDS July 2017 eGFR tables available from [`daids_july_2017`].

mod daids;
mod reference;
mod registry;

pub use daids::*;
pub use reference::*;
pub use registry::*;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Gender, ModelError};

/// Metric name for plain eGFR grading.
pub const EGFR_METRIC: &str = "egfr";
/// Metric name for eGFR percent-drop grading.
pub const EGFR_DROP_METRIC: &str = "egfr_drop";

/// Grading errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradingError {
    #[error("Reference range collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Reference range collection already registered: {0}")]
    AlreadyRegistered(String),

    #[error("No reference ranges for metric '{metric}' in collection '{collection}'")]
    MetricNotFound { collection: String, metric: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type GradingResult<T> = Result<T, GradingError>;

/// A matched severity band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Grade {
    /// Ordinal severity; larger is worse
    pub grade: u8,
    /// Human-readable band, e.g. "30<=x<60 mL/min/1.73 m2"
    pub description: String,
}

/// Demographic and time context a value is graded in.
#[derive(Debug, Clone, Copy)]
pub struct GradingContext<'a> {
    pub gender: Option<Gender>,
    pub dob: NaiveDate,
    pub report_datetime: DateTime<Utc>,
    pub units: &'a str,
}

/// A set of grading tables, one per metric.
pub trait GradingGroup {
    /// Grade `value` for `metric`. `Ok(None)` means the value is not graded
    /// (within normal range).
    fn get_grade(
        &self,
        metric: &str,
        value: f64,
        context: &GradingContext<'_>,
    ) -> GradingResult<Option<Grade>>;
}

/// Resolves a reference-range collection by name.
pub trait ReferenceRangeLookup {
    fn get(&self, collection_name: &str) -> Option<&dyn GradingGroup>;
}
