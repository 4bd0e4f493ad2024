//! Classifier that recognizes nothing (pattern-only mode).

use super::{TokenClassifier, TokenPrediction};
use crate::Result;

/// Classifier that returns no tokens.
///
/// Used when no recognition model is configured, leaving detection to the
/// pattern matchers.
pub struct NoopClassifier;

impl NoopClassifier {
    /// Creates a new no-op classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for NoopClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenClassifier for NoopClassifier {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn classify(&self, _text: &str) -> Result<Vec<TokenPrediction>> {
        Ok(Vec::new())
    }
}
