//! Recognizer tag to PII category remapping.

use crate::models::PiiCategory;
use std::collections::BTreeMap;

/// Maps recognizer entity types (`PER`, `LOC`, ...) to categories.
///
/// The built-in table is fixed: `PER → PERSON`, `LOC → GPE`, `MISC → ORG`,
/// `ORG → ORG`, and the system category names map to themselves. Extra
/// entries must be configured explicitly; any other tag is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    extra: BTreeMap<String, PiiCategory>,
}

impl LabelMap {
    /// Creates the built-in map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an explicit mapping for a tag the built-in table does not know.
    #[must_use]
    pub fn with_mapping(mut self, tag: &str, category: PiiCategory) -> Self {
        self.extra.insert(tag.trim().to_uppercase(), category);
        self
    }

    /// Resolves a recognizer entity type to a category.
    #[must_use]
    pub fn resolve(&self, tag: &str) -> Option<PiiCategory> {
        let upper = tag.trim().to_uppercase();
        let builtin = match upper.as_str() {
            "PER" => Some(PiiCategory::Person),
            "LOC" => Some(PiiCategory::Gpe),
            "MISC" => Some(PiiCategory::Org),
            other => PiiCategory::parse(other),
        };
        builtin.or_else(|| self.extra.get(&upper).cloned())
    }
}
