//! eGFR drop notification records.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{CallingContext, ModelError, ModelResult};

/// Review status of a drop notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportStatus {
    /// Raised by the engine, not yet looked at
    New,
    /// Under review by site staff
    Open,
    /// Review complete
    Closed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::New => "new",
            ReportStatus::Open => "open",
            ReportStatus::Closed => "closed",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s {
            "new" => Ok(ReportStatus::New),
            "open" => Ok(ReportStatus::Open),
            "closed" => Ok(ReportStatus::Closed),
            _ => Err(ModelError::UnknownCode {
                kind: "report status",
                code: s.to_string(),
            }),
        }
    }
}

/// "This visit's eGFR dropped past the notify threshold relative to baseline."
///
/// At most one record exists per subject visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EgfrDropNotification {
    /// Unique record ID
    pub id: String,
    /// Subject visit the drop was observed at
    pub subject_visit_id: String,
    /// Report timestamp of the calling record at creation
    pub report_datetime: DateTime<Utc>,
    /// Date the creatinine sample was assayed (UTC)
    pub creatinine_date: NaiveDate,
    /// Percent drop from baseline
    pub egfr_percent_change: f64,
    /// Review status
    pub report_status: ReportStatus,
    /// Consent version snapshot at creation
    pub consent_version: String,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl EgfrDropNotification {
    /// Create a new notification for the visit in `context`.
    pub fn new(context: &CallingContext, egfr_percent_change: f64) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject_visit_id: context.subject_visit_id.clone(),
            report_datetime: context.report_datetime,
            creatinine_date: context.creatinine_date(),
            egfr_percent_change,
            report_status: ReportStatus::New,
            consent_version: context.consent_version.clone(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Apply a re-evaluation of the same visit.
    ///
    /// Only the drop and the creatinine date change; status and consent
    /// version keep the values from creation.
    pub fn apply_reevaluation(&mut self, context: &CallingContext, egfr_percent_change: f64) {
        self.egfr_percent_change = egfr_percent_change;
        self.creatinine_date = context.creatinine_date();
        self.updated_at = Utc::now().to_rfc3339();
    }
}
