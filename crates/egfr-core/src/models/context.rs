//! Calling context supplied by the lab-result record being evaluated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The record on whose behalf an eGFR evaluation runs.
///
/// Only consulted when a drop notification has to be written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallingContext {
    /// Identity of the subject visit; drop notifications are keyed on it
    pub subject_visit_id: String,
    /// Report timestamp of the calling record
    pub report_datetime: DateTime<Utc>,
    /// When the creatinine sample was assayed
    pub assay_datetime: DateTime<Utc>,
    /// Consent version of the subject at this visit
    pub consent_version: String,
}

impl CallingContext {
    pub fn new(subject_visit_id: impl Into<String>, report_datetime: DateTime<Utc>) -> Self {
        Self {
            subject_visit_id: subject_visit_id.into(),
            report_datetime,
            assay_datetime: report_datetime,
            consent_version: "1".to_string(),
        }
    }

    /// Creatinine sample date, taken in UTC.
    pub fn creatinine_date(&self) -> NaiveDate {
        self.assay_datetime.date_naive()
    }
}
