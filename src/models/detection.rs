//! User-facing detection records.

use serde::{Deserialize, Serialize};

/// A final detection, as reported to operators.
///
/// `redacted_text` holds the instance key (`Person_1`), not the category
/// placeholder; the placeholder only appears in redaction-mode output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Per-category instance key, e.g. `Email_1`.
    pub key: String,
    /// Upper-case category name.
    pub label: String,
    /// Confidence rounded to four decimals.
    pub score: f64,
    /// The detected text.
    #[serde(rename = "original")]
    pub original_text: String,
    /// The key substituted for the original.
    #[serde(rename = "redacted")]
    pub redacted_text: String,
    /// Start offset (codepoints).
    pub start: usize,
    /// End offset (codepoints, exclusive).
    pub end: usize,
}

/// Rounds a score to four decimals for reporting.
#[must_use]
pub(crate) fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}
