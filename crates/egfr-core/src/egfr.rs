//! eGFR evaluation for one lab result.
//!
//! [`Egfr`] validates its options up front, then computes the eGFR value,
//! grade, drop from baseline and drop grade on first access. Each derived
//! field is held in a `OnceCell<EgfrResult<_>>`: empty until read, then the
//! value or the error for the rest of the instance's life. The one eager step
//! is the drop notification, which is decided during construction when both a
//! baseline and a threshold are supplied.

use std::cell::OnceCell;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::calculators::{percent_change, CalculatorInput, CalculatorKind, EgfrCalculatorError};
use crate::config::EgfrSettings;
use crate::grading::{
    GradingContext, GradingError, ReferenceRangeLookup, EGFR_DROP_METRIC, EGFR_METRIC,
};
use crate::models::{
    age_in_years, dob_from_age, round_result, CallingContext, CreatinineUnits, EgfrDropNotification,
    EgfrReport, Ethnicity, Gender, ModelError, PERCENT,
};
use crate::notify::{create_or_update_drop_notification, DropNotificationStore, NotificationError};

/// Evaluation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EgfrError {
    #[error("Invalid calculator name. Expected one of {expected:?}. Got {got}.")]
    InvalidCalculator {
        expected: Vec<&'static str>,
        got: String,
    },

    #[error("Expected age in years or date of birth. Got neither.")]
    MissingAge,

    #[error("Invalid demographics: {0}")]
    Demographics(#[from] ModelError),

    #[error("Drop notification threshold set without a {0}")]
    NotificationUnavailable(&'static str),

    #[error(transparent)]
    Calculator(#[from] EgfrCalculatorError),

    #[error(transparent)]
    Grading(#[from] GradingError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl EgfrError {
    /// Whether this error comes from construction-time validation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EgfrError::InvalidCalculator { .. }
                | EgfrError::MissingAge
                | EgfrError::Demographics(_)
                | EgfrError::NotificationUnavailable(_)
        )
    }
}

pub type EgfrResult<T> = Result<T, EgfrError>;

/// Raw inputs for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EgfrOptions {
    pub report_datetime: DateTime<Utc>,
    pub calculator_name: String,
    pub reference_range_collection_name: String,
    pub gender: Option<Gender>,
    pub ethnicity: Option<Ethnicity>,
    pub age_in_years: Option<u32>,
    pub dob: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub creatinine_value: Option<f64>,
    pub creatinine_units: Option<CreatinineUnits>,
    /// Earlier eGFR the drop is measured against
    pub baseline_egfr_value: Option<f64>,
    /// Percent drop at or above which a notification is written
    pub percent_drop_threshold: Option<f64>,
    /// Record the evaluation is for; needed when a threshold and baseline are set
    pub calling_context: Option<CallingContext>,
}

impl EgfrOptions {
    pub fn new(
        report_datetime: DateTime<Utc>,
        calculator_name: impl Into<String>,
        reference_range_collection_name: impl Into<String>,
    ) -> Self {
        Self {
            report_datetime,
            calculator_name: calculator_name.into(),
            reference_range_collection_name: reference_range_collection_name.into(),
            gender: None,
            ethnicity: None,
            age_in_years: None,
            dob: None,
            weight_kg: None,
            creatinine_value: None,
            creatinine_units: None,
            baseline_egfr_value: None,
            percent_drop_threshold: None,
            calling_context: None,
        }
    }

    /// Options seeded from site settings, including the notify threshold.
    pub fn from_settings(settings: &EgfrSettings, report_datetime: DateTime<Utc>) -> Self {
        let mut options = Self::new(
            report_datetime,
            settings.formula_name.clone(),
            settings.reference_range_collection_name.clone(),
        );
        options.percent_drop_threshold = settings.percent_drop_threshold;
        options
    }
}

/// One eGFR evaluation. Build a new instance per evaluation.
pub struct Egfr<'a> {
    calculator: CalculatorKind,
    input: CalculatorInput,
    dob: NaiveDate,
    report_datetime: DateTime<Utc>,
    reference_range_collection_name: String,
    baseline_egfr_value: Option<f64>,
    reportables: &'a dyn ReferenceRangeLookup,
    notification: Option<EgfrDropNotification>,

    egfr_value: OnceCell<EgfrResult<f64>>,
    egfr_grade: OnceCell<EgfrResult<Option<u8>>>,
    egfr_drop_value: OnceCell<EgfrResult<f64>>,
    egfr_drop_grade: OnceCell<EgfrResult<Option<u8>>>,
}

impl<'a> Egfr<'a> {
    /// Validate `options` and, if a baseline and threshold are both given,
    /// write the drop notification when the drop reaches the threshold.
    pub fn new(
        options: EgfrOptions,
        reportables: &'a dyn ReferenceRangeLookup,
        notifications: Option<&dyn DropNotificationStore>,
    ) -> EgfrResult<Self> {
        let calculator = options.calculator_name.parse::<CalculatorKind>().map_err(|got| {
            tracing::warn!(calculator_name = %options.calculator_name, "invalid calculator name");
            EgfrError::InvalidCalculator {
                expected: CalculatorKind::names(),
                got,
            }
        })?;

        let (age, dob) = match (options.dob, options.age_in_years) {
            (Some(dob), _) => (age_in_years(dob, options.report_datetime)?, dob),
            (None, Some(age)) => (age, dob_from_age(age, options.report_datetime)?),
            (None, None) => {
                tracing::warn!("neither age nor date of birth supplied");
                return Err(EgfrError::MissingAge);
            }
        };

        // The context and store are only needed when a drop can be measured.
        let notify = match (options.percent_drop_threshold, options.baseline_egfr_value) {
            (Some(threshold), Some(_)) => {
                let context = options
                    .calling_context
                    .ok_or(EgfrError::NotificationUnavailable("calling context"))?;
                let store = notifications.ok_or(EgfrError::NotificationUnavailable("notification store"))?;
                Some((threshold, context, store))
            }
            _ => None,
        };

        let mut egfr = Self {
            calculator,
            input: CalculatorInput {
                gender: options.gender,
                ethnicity: options.ethnicity,
                age_in_years: Some(age),
                weight_kg: options.weight_kg,
                creatinine_value: options.creatinine_value,
                creatinine_units: options.creatinine_units,
            },
            dob,
            report_datetime: options.report_datetime,
            reference_range_collection_name: options.reference_range_collection_name,
            baseline_egfr_value: options.baseline_egfr_value,
            reportables,
            notification: None,
            egfr_value: OnceCell::new(),
            egfr_grade: OnceCell::new(),
            egfr_drop_value: OnceCell::new(),
            egfr_drop_grade: OnceCell::new(),
        };

        if let Some((threshold, context, store)) = notify {
            let drop_value = egfr.egfr_drop_value()?;
            if drop_value > 0.0 && drop_value >= threshold {
                egfr.notification = Some(create_or_update_drop_notification(store, &context, drop_value)?);
            } else {
                tracing::debug!(drop_value, threshold, "egfr drop below notification threshold");
            }
        }

        Ok(egfr)
    }

    pub fn calculator(&self) -> CalculatorKind {
        self.calculator
    }

    /// Age in whole years at the report timestamp.
    pub fn age_in_years(&self) -> u32 {
        self.input.age_in_years.unwrap_or_default()
    }

    /// Date of birth, derived from the age when none was given.
    pub fn dob(&self) -> NaiveDate {
        self.dob
    }

    /// Notification written during construction, as stored.
    pub fn notification(&self) -> Option<&EgfrDropNotification> {
        self.notification.as_ref()
    }

    pub fn egfr_units(&self) -> &'static str {
        self.calculator.units()
    }

    pub fn egfr_drop_units(&self) -> &'static str {
        PERCENT
    }

    /// eGFR from the selected formula.
    pub fn egfr_value(&self) -> EgfrResult<f64> {
        self.egfr_value
            .get_or_init(|| Ok(self.calculator.calculate(&self.input)?))
            .clone()
    }

    /// Severity grade of the eGFR value; `None` within normal range.
    pub fn egfr_grade(&self) -> EgfrResult<Option<u8>> {
        self.egfr_grade
            .get_or_init(|| self.grade(EGFR_METRIC, self.egfr_value()?, self.egfr_units()))
            .clone()
    }

    /// Percent decline from baseline, floored at zero.
    ///
    /// Zero when there is no baseline, or the baseline is zero.
    pub fn egfr_drop_value(&self) -> EgfrResult<f64> {
        self.egfr_drop_value
            .get_or_init(|| match self.baseline_egfr_value {
                Some(baseline) if baseline != 0.0 => {
                    Ok(percent_change(self.egfr_value()?, baseline).max(0.0))
                }
                _ => Ok(0.0),
            })
            .clone()
    }

    /// Severity grade of the drop; `None` within normal range.
    pub fn egfr_drop_grade(&self) -> EgfrResult<Option<u8>> {
        self.egfr_drop_grade
            .get_or_init(|| self.grade(EGFR_DROP_METRIC, self.egfr_drop_value()?, PERCENT))
            .clone()
    }

    /// The eGFR value if it has been computed, without computing it.
    pub fn peek_egfr_value(&self) -> Option<&EgfrResult<f64>> {
        self.egfr_value.get()
    }

    /// All derived fields, rounded for storage.
    pub fn report(&self) -> EgfrResult<EgfrReport> {
        Ok(EgfrReport {
            egfr_value: round_result(self.egfr_value()?),
            egfr_units: self.egfr_units().to_string(),
            egfr_grade: self.egfr_grade()?,
            egfr_drop_value: round_result(self.egfr_drop_value()?),
            egfr_drop_units: self.egfr_drop_units().to_string(),
            egfr_drop_grade: self.egfr_drop_grade()?,
        })
    }

    fn grade(&self, metric: &str, value: f64, units: &str) -> EgfrResult<Option<u8>> {
        let group = self
            .reportables
            .get(&self.reference_range_collection_name)
            .ok_or_else(|| GradingError::CollectionNotFound(self.reference_range_collection_name.clone()))?;
        let context = GradingContext {
            gender: self.input.gender,
            dob: self.dob,
            report_datetime: self.report_datetime,
            units,
        };
        Ok(group.get_grade(metric, value, &context)?.map(|g| g.grade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::grading::{daids_july_2017, SiteReportables, DAIDS_JULY_2017};

    fn site() -> SiteReportables {
        let mut site = SiteReportables::new();
        site.register(daids_july_2017()).unwrap();
        site
    }

    fn options() -> EgfrOptions {
        let mut opts = EgfrOptions::new(Utc::now(), "ckd-epi", DAIDS_JULY_2017);
        opts.gender = Some(Gender::Male);
        opts.ethnicity = Some(Ethnicity::Black);
        opts.age_in_years = Some(25);
        opts.creatinine_value = Some(10.15);
        opts.creatinine_units = Some(CreatinineUnits::MilligramsPerDeciliter);
        opts
    }

    #[test]
    fn test_invalid_calculator_name() {
        let site = site();
        let mut opts = options();
        opts.calculator_name = "mdrd".into();

        let err = Egfr::new(opts, &site, None).err().unwrap();
        assert!(err.is_configuration());
        assert!(matches!(err, EgfrError::InvalidCalculator { ref got, .. } if got == "mdrd"));
    }

    #[test]
    fn test_missing_age_and_dob() {
        let site = site();
        let mut opts = options();
        opts.age_in_years = None;

        let err = Egfr::new(opts, &site, None).err().unwrap();
        assert_eq!(err, EgfrError::MissingAge);
        assert!(err.is_configuration());
    }

    #[test]
    fn test_dob_wins_over_age() {
        let site = site();
        let mut opts = options();
        opts.age_in_years = Some(99);
        opts.dob = dob_from_age(40, opts.report_datetime).ok();

        let egfr = Egfr::new(opts, &site, None).unwrap();
        assert_eq!(egfr.age_in_years(), 40);
    }

    #[test]
    fn test_age_derives_dob() {
        let site = site();
        let opts = options();
        let report_datetime = opts.report_datetime;

        let egfr = Egfr::new(opts, &site, None).unwrap();
        assert_eq!(age_in_years(egfr.dob(), report_datetime).unwrap(), 25);
    }

    #[test]
    fn test_fields_are_lazy_and_memoized() {
        let site = site();
        let egfr = Egfr::new(options(), &site, None).unwrap();

        assert!(egfr.peek_egfr_value().is_none());
        let first = egfr.egfr_value().unwrap();
        assert_eq!(egfr.peek_egfr_value(), Some(&Ok(first)));
        assert_eq!(egfr.egfr_value().unwrap(), first);
    }

    #[test]
    fn test_calculator_error_surfaces_lazily() {
        let site = site();
        let mut opts = options();
        opts.creatinine_value = None;

        let egfr = Egfr::new(opts, &site, None).unwrap();
        let err = egfr.egfr_value().unwrap_err();
        assert!(matches!(err, EgfrError::Calculator(_)));
        assert!(!err.is_configuration());
        assert_eq!(egfr.peek_egfr_value(), Some(&Err(err.clone())));
        assert_eq!(egfr.egfr_grade(), Err(err));

        // Without a baseline there is nothing to compare against.
        assert_eq!(egfr.egfr_drop_value(), Ok(0.0));
    }

    #[test]
    fn test_zero_baseline_is_no_baseline() {
        let site = site();
        let mut opts = options();
        opts.baseline_egfr_value = Some(0.0);

        let egfr = Egfr::new(opts, &site, None).unwrap();
        assert_eq!(egfr.egfr_drop_value(), Ok(0.0));
        assert!(egfr.peek_egfr_value().is_none());
    }

    #[test]
    fn test_improvement_clamps_to_zero() {
        let site = site();
        let mut opts = options();
        opts.baseline_egfr_value = Some(5.0);

        let egfr = Egfr::new(opts, &site, None).unwrap();
        assert!(egfr.egfr_value().unwrap() > 5.0);
        assert_eq!(egfr.egfr_drop_value(), Ok(0.0));
        assert_eq!(egfr.egfr_drop_grade(), Ok(None));
    }

    #[test]
    fn test_unknown_collection() {
        let site = site();
        let mut opts = options();
        opts.reference_range_collection_name = "nope".into();

        let egfr = Egfr::new(opts, &site, None).unwrap();
        assert!(egfr.egfr_value().is_ok());
        assert_eq!(
            egfr.egfr_grade(),
            Err(EgfrError::Grading(GradingError::CollectionNotFound("nope".into())))
        );
    }

    #[test]
    fn test_threshold_requires_context_and_store() {
        let site = site();
        let db = Database::open_in_memory().unwrap();

        let mut opts = options();
        opts.percent_drop_threshold = Some(20.0);
        opts.baseline_egfr_value = Some(23.0);
        let err = Egfr::new(opts.clone(), &site, Some(&db)).err().unwrap();
        assert_eq!(err, EgfrError::NotificationUnavailable("calling context"));

        opts.calling_context = Some(CallingContext::new("visit-1", Utc::now()));
        let err = Egfr::new(opts, &site, None).err().unwrap();
        assert_eq!(err, EgfrError::NotificationUnavailable("notification store"));
    }

    #[test]
    fn test_threshold_without_baseline_needs_no_context() {
        let site = site();
        let mut opts = EgfrOptions::from_settings(&EgfrSettings::default(), Utc::now());
        opts.gender = Some(Gender::Male);
        opts.ethnicity = Some(Ethnicity::Black);
        opts.age_in_years = Some(30);
        opts.creatinine_value = Some(52.0);
        opts.creatinine_units = Some(CreatinineUnits::MicromolesPerLiter);
        assert_eq!(opts.percent_drop_threshold, Some(20.0));

        let egfr = Egfr::new(opts, &site, None).unwrap();
        assert!(egfr.notification().is_none());
        assert!(egfr.egfr_value().unwrap() > 0.0);
        assert_eq!(egfr.egfr_drop_value().unwrap(), 0.0);
    }

    #[test]
    fn test_no_notification_without_baseline() {
        let site = site();
        let db = Database::open_in_memory().unwrap();
        let mut opts = options();
        opts.percent_drop_threshold = Some(0.0);
        opts.calling_context = Some(CallingContext::new("visit-1", Utc::now()));

        let egfr = Egfr::new(opts, &site, Some(&db)).unwrap();
        assert!(egfr.notification().is_none());
        assert!(db.list_drop_notifications().unwrap().is_empty());
    }

    #[test]
    fn test_report_rounds_values() {
        let site = site();
        let mut opts = options();
        opts.baseline_egfr_value = Some(23.0);

        let report = Egfr::new(opts, &site, None).unwrap().report().unwrap();
        assert_eq!(report.egfr_value, 7.3265);
        assert_eq!(report.egfr_units, "mL/min/1.73 m2");
        assert_eq!(report.egfr_grade, Some(4));
        assert_eq!(report.egfr_drop_value, 68.1457);
        assert_eq!(report.egfr_drop_units, "%");
        assert_eq!(report.egfr_drop_grade, Some(4));
    }

    #[test]
    fn test_from_settings() {
        let settings = EgfrSettings::default();
        let opts = EgfrOptions::from_settings(&settings, Utc::now());
        assert_eq!(opts.calculator_name, "ckd-epi");
        assert_eq!(opts.reference_range_collection_name, DAIDS_JULY_2017);
        assert_eq!(opts.percent_drop_threshold, Some(20.0));
    }
}
