//! PII category taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a detected PII span.
///
/// The first six variants come from the pattern detectors, the next four from
/// entity recognition. [`PiiCategory::Custom`] only appears when a recognizer
/// label is explicitly mapped to a new category in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PiiCategory {
    /// Email address.
    Email,
    /// `http://` or `https://` URL.
    Url,
    /// Dotted-quad IPv4 address.
    Ip,
    /// Phone number.
    Phone,
    /// National identity number.
    NationalId,
    /// Payment card number (checksum validated).
    CreditCard,
    /// Person name.
    Person,
    /// Organization or miscellaneous named entity.
    Org,
    /// Geo-political entity or location.
    Gpe,
    /// Street address.
    Address,
    /// Explicitly configured extra category, stored upper-case.
    Custom(String),
}

impl PiiCategory {
    /// Returns all built-in categories.
    #[must_use]
    pub const fn builtin() -> &'static [Self] {
        &[
            Self::Email,
            Self::Url,
            Self::Ip,
            Self::Phone,
            Self::NationalId,
            Self::CreditCard,
            Self::Person,
            Self::Org,
            Self::Gpe,
            Self::Address,
        ]
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email => "EMAIL",
            Self::Url => "URL",
            Self::Ip => "IP",
            Self::Phone => "PHONE",
            Self::NationalId => "NATIONAL_ID",
            Self::CreditCard => "CREDIT_CARD",
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Gpe => "GPE",
            Self::Address => "ADDRESS",
            Self::Custom(name) => name,
        }
    }

    /// Parses a built-in category name (case-insensitive).
    ///
    /// Returns `None` for anything outside the built-in taxonomy; use
    /// [`PiiCategory::custom`] to create an extra category on purpose.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase().replace(['-', ' '], "_");
        Self::builtin()
            .iter()
            .find(|category| category.as_str() == upper)
            .cloned()
    }

    /// Creates a category, falling back to a custom one for unknown names.
    #[must_use]
    pub fn custom(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| Self::Custom(name.trim().to_uppercase()))
    }

    /// Returns the label used in instance keys: first letter upper-case, the
    /// rest lower-case (`Email`, `Credit_card`).
    #[must_use]
    pub fn key_label(&self) -> String {
        let lower = self.as_str().to_lowercase();
        let mut chars = lower.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PiiCategory {
    fn from(s: String) -> Self {
        Self::custom(&s)
    }
}

impl From<PiiCategory> for String {
    fn from(category: PiiCategory) -> Self {
        category.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(PiiCategory::parse("email"), Some(PiiCategory::Email));
        assert_eq!(PiiCategory::parse("Credit_Card"), Some(PiiCategory::CreditCard));
        assert_eq!(PiiCategory::parse("national-id"), Some(PiiCategory::NationalId));
        assert_eq!(PiiCategory::parse("DATE"), None);
    }

    #[test]
    fn test_custom_keeps_builtin() {
        assert_eq!(PiiCategory::custom("person"), PiiCategory::Person);
        assert_eq!(
            PiiCategory::custom("date"),
            PiiCategory::Custom("DATE".to_string())
        );
    }

    #[test]
    fn test_key_label() {
        assert_eq!(PiiCategory::Email.key_label(), "Email");
        assert_eq!(PiiCategory::Url.key_label(), "Url");
        assert_eq!(PiiCategory::CreditCard.key_label(), "Credit_card");
        assert_eq!(PiiCategory::Ip.key_label(), "Ip");
        assert_eq!(PiiCategory::custom("date").key_label(), "Date");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&PiiCategory::NationalId).unwrap();
        assert_eq!(json, "\"NATIONAL_ID\"");
        let parsed: PiiCategory = serde_json::from_str("\"gpe\"").unwrap();
        assert_eq!(parsed, PiiCategory::Gpe);
    }
}
