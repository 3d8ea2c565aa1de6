//! Registry of reference-range collections by name.

use std::collections::HashMap;

use super::{GradingError, GradingGroup, GradingResult, ReferenceRangeCollection, ReferenceRangeLookup};

/// Reference-range collections available to a site.
#[derive(Debug, Clone, Default)]
pub struct SiteReportables {
    registry: HashMap<String, ReferenceRangeCollection>,
}

impl SiteReportables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection under its own name.
    pub fn register(&mut self, collection: ReferenceRangeCollection) -> GradingResult<()> {
        if self.registry.contains_key(&collection.name) {
            return Err(GradingError::AlreadyRegistered(collection.name));
        }
        tracing::debug!(name = %collection.name, "registered reference range collection");
        self.registry.insert(collection.name.clone(), collection);
        Ok(())
    }

    /// Get a collection, failing if it was never registered.
    pub fn collection(&self, name: &str) -> GradingResult<&ReferenceRangeCollection> {
        self.registry
            .get(name)
            .ok_or_else(|| GradingError::CollectionNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ReferenceRangeLookup for SiteReportables {
    fn get(&self, collection_name: &str) -> Option<&dyn GradingGroup> {
        self.registry
            .get(collection_name)
            .map(|c| c as &dyn GradingGroup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::{daids_july_2017, daids_july_2017_named, DAIDS_JULY_2017};

    #[test]
    fn test_register_and_get() {
        let mut site = SiteReportables::new();
        site.register(daids_july_2017()).unwrap();
        site.register(daids_july_2017_named("my_reference_list")).unwrap();

        assert!(site.get(DAIDS_JULY_2017).is_some());
        assert!(site.get("my_reference_list").is_some());
        assert!(site.get("missing").is_none());
        assert_eq!(site.names(), vec![DAIDS_JULY_2017, "my_reference_list"]);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut site = SiteReportables::new();
        site.register(daids_july_2017()).unwrap();
        assert_eq!(
            site.register(daids_july_2017()),
            Err(GradingError::AlreadyRegistered(DAIDS_JULY_2017.to_string()))
        );
    }

    #[test]
    fn test_collection_not_found() {
        let site = SiteReportables::new();
        assert!(matches!(
            site.collection("nope"),
            Err(GradingError::CollectionNotFound(_))
        ));
    }
}
