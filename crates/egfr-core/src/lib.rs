//! eGFR Core Library
//!
//! Estimated glomerular filtration rate for lab-result records: formula
//! calculation, severity grading, and drop-from-baseline notifications.
//!
//! # Architecture
//!
//! ```text
//! demographics + creatinine ──► Calculator (CKD-EPI | Cockcroft-Gault)
//!                                      │
//!                                 egfr_value ──────► grading "egfr" ──► egfr_grade
//!                                      │
//!                   baseline ──► percent change ≥ 0
//!                                      │
//!                              egfr_drop_value ────► grading "egfr_drop" ──► egfr_drop_grade
//!                                      │
//!                        ≥ threshold?  ▼
//!                     ┌────────────────────────────────┐
//!                     │  create-or-update notification │
//!                     │  (one per subject visit, in a  │
//!                     │   single store transaction)    │
//!                     └────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`calculators`]: eGFR formulas and percent change
//! - [`grading`]: reference-range lookup and the DAIDS July 2017 tables
//! - [`egfr`]: the per-evaluation orchestrator
//! - [`notify`]: drop-notification store traits and the upsert
//! - [`db`]: SQLite notification store
//! - [`models`]: domain types
//! - [`config`]: site settings

pub mod calculators;
pub mod config;
pub mod db;
pub mod egfr;
pub mod grading;
pub mod models;
pub mod notify;

// Re-export commonly used types
pub use calculators::{percent_change, CalculatorInput, CalculatorKind, EgfrCalculator, EgfrCalculatorError};
pub use config::EgfrSettings;
pub use db::Database;
pub use egfr::{Egfr, EgfrError, EgfrOptions};
pub use grading::{daids_july_2017, ReferenceRangeCollection, SiteReportables};
pub use models::{
    CallingContext, CreatinineUnits, EgfrDropNotification, EgfrReport, Ethnicity, Gender,
    ReportStatus,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum EgfrCoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Calculator error: {0}")]
    CalculatorError(String),

    #[error("Grading error: {0}")]
    GradingError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for EgfrCoreError {
    fn from(e: db::DbError) -> Self {
        EgfrCoreError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for EgfrCoreError {
    fn from(e: serde_json::Error) -> Self {
        EgfrCoreError::SerializationError(e.to_string())
    }
}

impl From<models::ModelError> for EgfrCoreError {
    fn from(e: models::ModelError) -> Self {
        EgfrCoreError::InvalidInput(e.to_string())
    }
}

impl From<grading::GradingError> for EgfrCoreError {
    fn from(e: grading::GradingError) -> Self {
        EgfrCoreError::GradingError(e.to_string())
    }
}

impl From<EgfrError> for EgfrCoreError {
    fn from(e: EgfrError) -> Self {
        match e {
            EgfrError::Calculator(_) => EgfrCoreError::CalculatorError(e.to_string()),
            EgfrError::Grading(_) => EgfrCoreError::GradingError(e.to_string()),
            EgfrError::Notification(_) => EgfrCoreError::DatabaseError(e.to_string()),
            _ => EgfrCoreError::ConfigurationError(e.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for EgfrCoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        EgfrCoreError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a notification database at the given path.
///
/// `settings_json` overrides the default [`EgfrSettings`].
#[uniffi::export]
pub fn open_database(
    path: String,
    settings_json: Option<String>,
) -> Result<Arc<EgfrCore>, EgfrCoreError> {
    let settings = match settings_json {
        Some(json) => EgfrSettings::from_json(&json)?,
        None => EgfrSettings::default(),
    };
    let db = Database::open(&path)?;
    Ok(Arc::new(EgfrCore::new(db, settings)?))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<EgfrCore>, EgfrCoreError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(EgfrCore::new(db, EgfrSettings::default())?))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe evaluator for FFI: notification store, grading tables and
/// site settings.
#[derive(uniffi::Object)]
pub struct EgfrCore {
    db: Arc<Mutex<Database>>,
    reportables: SiteReportables,
    settings: EgfrSettings,
}

impl EgfrCore {
    fn new(db: Database, settings: EgfrSettings) -> Result<Self, EgfrCoreError> {
        let mut reportables = SiteReportables::new();
        reportables.register(daids_july_2017())?;
        if reportables.collection(&settings.reference_range_collection_name).is_err() {
            reportables.register(grading::daids_july_2017_named(
                &settings.reference_range_collection_name,
            ))?;
        }
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            reportables,
            settings,
        })
    }
}

#[uniffi::export]
impl EgfrCore {
    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluate one lab result, writing a drop notification if warranted.
    pub fn evaluate(&self, request: FfiEgfrRequest) -> Result<FfiEgfrResult, EgfrCoreError> {
        let options = request.into_options(&self.settings)?;
        let db = self.db.lock()?;
        let egfr = Egfr::new(options, &self.reportables, Some(&*db))?;
        let report = egfr.report()?;
        Ok(FfiEgfrResult {
            egfr_value: report.egfr_value,
            egfr_units: report.egfr_units,
            egfr_grade: report.egfr_grade,
            egfr_drop_value: report.egfr_drop_value,
            egfr_drop_units: report.egfr_drop_units,
            egfr_drop_grade: report.egfr_drop_grade,
            notification: egfr.notification().cloned().map(Into::into),
        })
    }

    // =========================================================================
    // Notification Operations
    // =========================================================================

    /// Get the drop notification for a subject visit.
    pub fn get_drop_notification(
        &self,
        subject_visit_id: String,
    ) -> Result<Option<FfiDropNotification>, EgfrCoreError> {
        let db = self.db.lock()?;
        let notification = db.get_drop_notification_for_visit(&subject_visit_id)?;
        Ok(notification.map(|n| n.into()))
    }

    /// Delete the drop notification for a subject visit.
    pub fn delete_drop_notification(&self, subject_visit_id: String) -> Result<bool, EgfrCoreError> {
        let db = self.db.lock()?;
        Ok(db.delete_drop_notification(&subject_visit_id)?)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Names of the registered reference-range collections.
    pub fn reference_range_collections(&self) -> Vec<String> {
        self.reportables.names().into_iter().map(String::from).collect()
    }

    /// Active settings as JSON.
    pub fn settings_json(&self) -> Result<String, EgfrCoreError> {
        Ok(self.settings.to_json()?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe evaluation request. Enumerations are passed as their string
/// codes, timestamps as RFC 3339 and dates as YYYY-MM-DD.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEgfrRequest {
    pub report_datetime: String,
    pub gender: Option<String>,
    pub ethnicity: Option<String>,
    pub age_in_years: Option<u32>,
    pub dob: Option<String>,
    pub weight_kg: Option<f64>,
    pub creatinine_value: Option<f64>,
    pub creatinine_units: Option<String>,
    pub baseline_egfr_value: Option<f64>,
    pub formula_name: Option<String>,
    pub reference_range_collection_name: Option<String>,
    pub percent_drop_threshold: Option<f64>,
    pub subject_visit_id: Option<String>,
    pub assay_datetime: Option<String>,
    pub consent_version: Option<String>,
}

impl FfiEgfrRequest {
    /// Build options, falling back to `settings` for anything not given.
    ///
    /// Without a subject visit there is nothing to attach a notification to,
    /// so the threshold is dropped.
    fn into_options(self, settings: &EgfrSettings) -> Result<EgfrOptions, EgfrCoreError> {
        let report_datetime = parse_datetime(&self.report_datetime)?;
        let mut options = EgfrOptions::from_settings(settings, report_datetime);

        if let Some(name) = self.formula_name {
            options.calculator_name = name;
        }
        if let Some(name) = self.reference_range_collection_name {
            options.reference_range_collection_name = name;
        }
        options.gender = self.gender.as_deref().map(str::parse).transpose()?;
        options.ethnicity = self.ethnicity.as_deref().map(str::parse).transpose()?;
        options.creatinine_units = self.creatinine_units.as_deref().map(str::parse).transpose()?;
        options.age_in_years = self.age_in_years;
        options.dob = self.dob.as_deref().map(parse_date).transpose()?;
        options.weight_kg = self.weight_kg;
        options.creatinine_value = self.creatinine_value;
        options.baseline_egfr_value = self.baseline_egfr_value;

        match self.subject_visit_id {
            Some(subject_visit_id) => {
                if self.percent_drop_threshold.is_some() {
                    options.percent_drop_threshold = self.percent_drop_threshold;
                }
                let mut context = CallingContext::new(subject_visit_id, report_datetime);
                if let Some(assay) = self.assay_datetime.as_deref() {
                    context.assay_datetime = parse_datetime(assay)?;
                }
                if let Some(version) = self.consent_version {
                    context.consent_version = version;
                }
                options.calling_context = Some(context);
            }
            None => options.percent_drop_threshold = None,
        }
        Ok(options)
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, EgfrCoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EgfrCoreError::InvalidInput(format!("Bad timestamp {}: {}", value, e)))
}

fn parse_date(value: &str) -> Result<NaiveDate, EgfrCoreError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| EgfrCoreError::InvalidInput(format!("Bad date {}: {}", value, e)))
}

/// FFI-safe evaluation result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEgfrResult {
    pub egfr_value: f64,
    pub egfr_units: String,
    pub egfr_grade: Option<u8>,
    pub egfr_drop_value: f64,
    pub egfr_drop_units: String,
    pub egfr_drop_grade: Option<u8>,
    pub notification: Option<FfiDropNotification>,
}

/// FFI-safe drop notification.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDropNotification {
    pub id: String,
    pub subject_visit_id: String,
    pub report_datetime: String,
    pub creatinine_date: String,
    pub egfr_percent_change: f64,
    pub report_status: String,
    pub consent_version: String,
}

impl From<EgfrDropNotification> for FfiDropNotification {
    fn from(n: EgfrDropNotification) -> Self {
        Self {
            id: n.id,
            subject_visit_id: n.subject_visit_id,
            report_datetime: n.report_datetime.to_rfc3339(),
            creatinine_date: n.creatinine_date.to_string(),
            egfr_percent_change: n.egfr_percent_change,
            report_status: n.report_status.as_str().to_string(),
            consent_version: n.consent_version,
        }
    }
}
