//! DAIDS Table for Grading the Severity of Adult and Pediatric Adverse
//! Events, corrected version 2.1 (July 2017): creatinine clearance / eGFR.

use super::{GradeReference, ReferenceRangeCollection, EGFR_DROP_METRIC, EGFR_METRIC};
use crate::models::{CRCL_UNITS, EGFR_UNITS, PERCENT};

/// Default collection name for [`daids_july_2017`].
pub const DAIDS_JULY_2017: &str = "daids_july_2017";

const ADULT_AGE: u32 = 18;

/// eGFR and eGFR-drop grading, adults only.
///
/// eGFR (both mL/min/1.73 m² and mL/min): grade 2 for 60-<90, grade 3 for
/// 30-<60, grade 4 below 30. Percent drop from baseline: grade 2 for 10-<30,
/// grade 3 for 30-<50, grade 4 from 50.
pub fn daids_july_2017() -> ReferenceRangeCollection {
    daids_july_2017_named(DAIDS_JULY_2017)
}

/// Same tables as [`daids_july_2017`], registered under another name.
pub fn daids_july_2017_named(name: &str) -> ReferenceRangeCollection {
    let mut collection = ReferenceRangeCollection::new(name);

    for units in [EGFR_UNITS, CRCL_UNITS] {
        collection.add(EGFR_METRIC, GradeReference::between(2, 60.0, 90.0, units).adults_from(ADULT_AGE));
        collection.add(EGFR_METRIC, GradeReference::between(3, 30.0, 60.0, units).adults_from(ADULT_AGE));
        collection.add(EGFR_METRIC, GradeReference::below(4, 30.0, units).adults_from(ADULT_AGE));
    }

    collection.add(EGFR_DROP_METRIC, GradeReference::between(2, 10.0, 30.0, PERCENT).adults_from(ADULT_AGE));
    collection.add(EGFR_DROP_METRIC, GradeReference::between(3, 30.0, 50.0, PERCENT).adults_from(ADULT_AGE));
    collection.add(EGFR_DROP_METRIC, GradeReference::at_least(4, 50.0, PERCENT).adults_from(ADULT_AGE));

    collection
}
