//! Placeholder policy for redaction-mode output.

use super::PiiCategory;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Placeholder used for categories without an entry in the policy.
pub const DEFAULT_PLACEHOLDER: &str = "[REDACTED]";

/// Maps categories to the fixed placeholder substituted in redacted output.
///
/// The default table is immutable; per-call overrides produce a new policy
/// with the override winning on collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionPolicy {
    placeholders: BTreeMap<PiiCategory, String>,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        let placeholders = [
            (PiiCategory::Email, "[EMAIL]"),
            (PiiCategory::Phone, "[PHONE]"),
            (PiiCategory::CreditCard, "[CARD]"),
            (PiiCategory::Ip, "[IP]"),
            (PiiCategory::Url, "[URL]"),
            (PiiCategory::Person, "[NAME]"),
            (PiiCategory::Org, "[ORG]"),
            (PiiCategory::Gpe, "[LOCATION]"),
            (PiiCategory::Address, "[ADDRESS]"),
            (PiiCategory::NationalId, "[ID]"),
        ]
        .into_iter()
        .map(|(category, placeholder)| (category, placeholder.to_string()))
        .collect();

        Self { placeholders }
    }
}

impl RedactionPolicy {
    /// Creates a policy with no entries; every category maps to
    /// [`DEFAULT_PLACEHOLDER`].
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            placeholders: BTreeMap::new(),
        }
    }

    /// Returns a copy of this policy with `overrides` merged in.
    #[must_use]
    pub fn with_overrides<I>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (PiiCategory, String)>,
    {
        let mut merged = self.clone();
        merged.placeholders.extend(overrides);
        merged
    }

    /// Returns the placeholder for a category.
    #[must_use]
    pub fn placeholder(&self, category: &PiiCategory) -> &str {
        self.placeholders
            .get(category)
            .map_or(DEFAULT_PLACEHOLDER, String::as_str)
    }

    /// Parses a `CATEGORY=PLACEHOLDER` override.
    pub fn parse_override(raw: &str) -> Result<(PiiCategory, String)> {
        let (category, placeholder) = raw.split_once('=').ok_or_else(|| {
            Error::InvalidInput(format!("policy override '{raw}' must be CATEGORY=PLACEHOLDER"))
        })?;
        if category.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "policy override '{raw}' has an empty category"
            )));
        }
        Ok((PiiCategory::custom(category), placeholder.to_string()))
    }
}
