//! Candidate and final PII spans.

use super::PiiCategory;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A labeled range of text.
///
/// Offsets are codepoint indices; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Category of the span.
    pub label: PiiCategory,
    /// Confidence in `[0, 1]`; pattern matches carry `1.0`.
    pub score: f64,
}

impl Span {
    /// Score assigned to deterministic pattern matches.
    pub const PATTERN_SCORE: f64 = 1.0;

    /// Creates a span.
    #[must_use]
    pub const fn new(start: usize, end: usize, label: PiiCategory, score: f64) -> Self {
        Self {
            start,
            end,
            label,
            score,
        }
    }

    /// Creates a span for a deterministic pattern match.
    #[must_use]
    pub const fn pattern(start: usize, end: usize, label: PiiCategory) -> Self {
        Self::new(start, end, label, Self::PATTERN_SCORE)
    }

    /// Number of codepoints covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span covers nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Checks `start < end <= text_len`.
    pub fn validate(&self, text_len: usize) -> Result<()> {
        if self.start >= self.end || self.end > text_len {
            return Err(Error::InvalidSpan {
                start: self.start,
                end: self.end,
                len: text_len,
            });
        }
        Ok(())
    }
}
