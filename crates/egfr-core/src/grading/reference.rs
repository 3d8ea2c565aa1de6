//! Grade bands and reference-range collections.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Grade, GradingContext, GradingError, GradingGroup, GradingResult};
use crate::models::{age_in_years, Gender};

/// One severity band of a grading table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeReference {
    /// Ordinal severity
    pub grade: u8,
    /// Lower bound; `None` is unbounded
    pub lower: Option<f64>,
    pub lower_inclusive: bool,
    /// Upper bound; `None` is unbounded
    pub upper: Option<f64>,
    pub upper_inclusive: bool,
    /// Units the bounds are expressed in
    pub units: String,
    /// Restrict to one gender; `None` applies to all
    pub gender: Option<Gender>,
    /// Minimum age in years (inclusive)
    pub age_lower: Option<u32>,
    /// Maximum age in years (exclusive)
    pub age_upper: Option<u32>,
}

impl GradeReference {
    /// Band for `lower <= x < upper`.
    pub fn between(grade: u8, lower: f64, upper: f64, units: &str) -> Self {
        Self {
            grade,
            lower: Some(lower),
            lower_inclusive: true,
            upper: Some(upper),
            upper_inclusive: false,
            units: units.to_string(),
            gender: None,
            age_lower: None,
            age_upper: None,
        }
    }

    /// Band for `x < upper`.
    pub fn below(grade: u8, upper: f64, units: &str) -> Self {
        Self {
            lower: None,
            ..Self::between(grade, 0.0, upper, units)
        }
    }

    /// Band for `x >= lower`.
    pub fn at_least(grade: u8, lower: f64, units: &str) -> Self {
        Self {
            upper: None,
            ..Self::between(grade, lower, 0.0, units)
        }
    }

    /// Restrict the band to ages `age_lower <= age`.
    pub fn adults_from(mut self, age_lower: u32) -> Self {
        self.age_lower = Some(age_lower);
        self
    }

    fn contains(&self, value: f64) -> bool {
        let above = match self.lower {
            Some(lower) if self.lower_inclusive => value >= lower,
            Some(lower) => value > lower,
            None => true,
        };
        let below = match self.upper {
            Some(upper) if self.upper_inclusive => value <= upper,
            Some(upper) => value < upper,
            None => true,
        };
        above && below
    }

    fn applies_to(&self, gender: Option<Gender>, age: u32, units: &str) -> bool {
        if self.units != units {
            return false;
        }
        if self.gender.is_some() && self.gender != gender {
            return false;
        }
        self.age_lower.map_or(true, |lo| age >= lo) && self.age_upper.map_or(true, |hi| age < hi)
    }

    /// Human-readable band description.
    pub fn description(&self) -> String {
        let mut out = String::new();
        if let Some(lower) = self.lower {
            out.push_str(&format!("{}{}", lower, if self.lower_inclusive { "<=" } else { "<" }));
        }
        out.push('x');
        if let Some(upper) = self.upper {
            out.push_str(&format!("{}{}", if self.upper_inclusive { "<=" } else { "<" }, upper));
        }
        format!("{} {}", out, self.units)
    }
}

/// Named set of grading tables keyed by metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRangeCollection {
    pub name: String,
    pub grading: HashMap<String, Vec<GradeReference>>,
}

impl ReferenceRangeCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grading: HashMap::new(),
        }
    }

    /// Add a band to a metric's table.
    pub fn add(&mut self, metric: &str, reference: GradeReference) {
        self.grading.entry(metric.to_string()).or_default().push(reference);
    }

    pub fn metrics(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.grading.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl GradingGroup for ReferenceRangeCollection {
    fn get_grade(
        &self,
        metric: &str,
        value: f64,
        context: &GradingContext<'_>,
    ) -> GradingResult<Option<Grade>> {
        let references = self
            .grading
            .get(metric)
            .ok_or_else(|| GradingError::MetricNotFound {
                collection: self.name.clone(),
                metric: metric.to_string(),
            })?;
        let age = age_in_years(context.dob, context.report_datetime)?;

        // Overlapping bands resolve to the most severe grade.
        let grade = references
            .iter()
            .filter(|r| r.applies_to(context.gender, age, context.units) && r.contains(value))
            .max_by_key(|r| r.grade)
            .map(|r| Grade {
                grade: r.grade,
                description: r.description(),
            });

        tracing::debug!(
            collection = %self.name,
            metric,
            value,
            grade = ?grade.as_ref().map(|g| g.grade),
            "graded value"
        );
        Ok(grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn context(units: &str) -> GradingContext<'_> {
        GradingContext {
            gender: Some(Gender::Male),
            dob: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            report_datetime: Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap(),
            units,
        }
    }

    fn collection() -> ReferenceRangeCollection {
        let mut c = ReferenceRangeCollection::new("test");
        c.add("crp", GradeReference::between(2, 10.0, 20.0, "mg/L"));
        c.add("crp", GradeReference::at_least(3, 20.0, "mg/L"));
        c
    }

    #[test]
    fn test_bounds_inclusivity() {
        let c = collection();
        let ctx = context("mg/L");
        assert_eq!(c.get_grade("crp", 9.99, &ctx).unwrap(), None);
        assert_eq!(c.get_grade("crp", 10.0, &ctx).unwrap().unwrap().grade, 2);
        assert_eq!(c.get_grade("crp", 20.0, &ctx).unwrap().unwrap().grade, 3);
    }

    #[test]
    fn test_units_must_match() {
        let c = collection();
        assert_eq!(c.get_grade("crp", 15.0, &context("mg/dL")).unwrap(), None);
    }

    #[test]
    fn test_unknown_metric() {
        let c = collection();
        assert!(matches!(
            c.get_grade("alt", 15.0, &context("mg/L")),
            Err(GradingError::MetricNotFound { .. })
        ));
    }

    #[test]
    fn test_gender_and_age_restrictions() {
        let mut c = ReferenceRangeCollection::new("test");
        let mut female_only = GradeReference::below(2, 12.0, "g/dL");
        female_only.gender = Some(Gender::Female);
        c.add("hb", female_only);
        c.add("hb", GradeReference::below(3, 8.0, "g/dL").adults_from(40));

        let ctx = context("g/dL");
        assert_eq!(c.get_grade("hb", 10.0, &ctx).unwrap(), None); // male, 30
        assert_eq!(c.get_grade("hb", 7.0, &ctx).unwrap(), None);

        let ctx = GradingContext {
            gender: Some(Gender::Female),
            ..ctx
        };
        assert_eq!(c.get_grade("hb", 10.0, &ctx).unwrap().unwrap().grade, 2);
    }

    #[test]
    fn test_most_severe_band_wins() {
        let mut c = collection();
        c.add("crp", GradeReference::at_least(4, 15.0, "mg/L"));
        assert_eq!(c.get_grade("crp", 16.0, &context("mg/L")).unwrap().unwrap().grade, 4);
    }

    #[test]
    fn test_description() {
        assert_eq!(GradeReference::between(2, 60.0, 90.0, "%").description(), "60<=x<90 %");
        assert_eq!(GradeReference::below(4, 30.0, "%").description(), "x<30 %");
        assert_eq!(GradeReference::at_least(4, 50.0, "%").description(), "50<=x %");
    }
}
