//! Filter registry: an explicit, constructed value handed to pipeline
//! construction.
//!
//! There is no process-wide registry; whoever builds a pipeline builds (or
//! receives) the registry, and it is torn down with the run. Registry keys
//! are the filters' stable names.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::filter::Filter;
use crate::filters::{
    CreateDataArrayFilter, CreateImageGeometryFilter, DeleteObjectFilter, RenameObjectFilter,
    ThresholdMaskFilter,
};
use crate::mill_error::DataMillError;

/// Name-keyed collection of filter factories.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in structural filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CreateDataArrayFilter));
        registry.register(Arc::new(CreateImageGeometryFilter));
        registry.register(Arc::new(ThresholdMaskFilter));
        registry.register(Arc::new(RenameObjectFilter));
        registry.register(Arc::new(DeleteObjectFilter));
        registry
    }

    /// Register a filter under its stable name, replacing any previous
    /// holder of that name.
    pub fn register(&mut self, filter: Arc<dyn Filter>) {
        self.filters.insert(filter.name().to_owned(), filter);
    }

    /// Look up a filter by name.
    ///
    /// # Errors
    /// `UnknownFilter` carrying the requested name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Filter>, DataMillError> {
        self.filters
            .get(name)
            .cloned()
            .ok_or_else(|| DataMillError::UnknownFilter(name.to_owned()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("names", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = FilterRegistry::with_builtins();
        assert_eq!(registry.len(), 5);
        assert!(registry.get("CreateDataArray").is_ok());
        assert!(registry.get("ThresholdMask").is_ok());
    }

    #[test]
    fn unknown_name_is_reported() {
        let registry = FilterRegistry::new();
        let err = registry.get("Nope").unwrap_err();
        assert_eq!(err, DataMillError::UnknownFilter("Nope".into()));
        assert_eq!(err.code(), -150);
    }
}
