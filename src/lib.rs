//! # piiguard
//!
//! Detection and redaction of personally identifiable information in free text.
//!
//! Deterministic pattern matchers (email, URL, IPv4, phone, national ID and
//! checksum-validated card numbers) run alongside a pluggable token-classification
//! recognizer. Their candidate spans are merged into one non-overlapping set and
//! replaced with numbered instance keys (`Person_1`, `Email_2`) or category
//! placeholders (`[NAME]`, `[EMAIL]`).
//!
//! ## Example
//!
//! ```rust
//! use piiguard::pipeline::{PiiPipeline, PipelineConfig};
//!
//! let pipeline = PiiPipeline::new(PipelineConfig::default());
//! let redacted = pipeline
//!     .redact("Contact alex@example.com or visit https://example.com")
//!     .unwrap();
//! assert_eq!(redacted, "Contact [EMAIL] or visit [URL]");
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod patterns;
pub mod pipeline;
pub mod recognizer;
#[cfg(feature = "http")]
pub mod server;
pub mod text;

pub use config::PiiguardConfig;
pub use models::{Detection, PiiCategory, RedactionPolicy, Span};
pub use patterns::PatternDetector;
pub use pipeline::{Analysis, PiiPipeline, PipelineConfig};
pub use recognizer::{EntityRecognizer, TokenClassifier, TokenPrediction};

/// Error type for piiguard operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Bad threshold, malformed policy override, unreadable input |
/// | `InvalidSpan` | A span falls outside the text or is empty |
/// | `Recognition` | The token classifier failed or is saturated |
/// | `OperationFailed` | Config I/O, logging setup, server bind/serve failures |
/// | `FeatureNotEnabled` | Using features requiring compile-time flags |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A span does not fit the text it was produced for.
    ///
    /// Well-formed detectors never produce these; the pipeline drops such
    /// spans before they reach the merger.
    #[error("invalid span {start}..{end} for text of {len} characters")]
    InvalidSpan {
        /// Start offset (codepoints).
        start: usize,
        /// End offset (codepoints, exclusive).
        end: usize,
        /// Length of the text in codepoints.
        len: usize,
    },

    /// The entity recognizer failed.
    ///
    /// Kept separate from other failures so callers can still use the
    /// pattern detections produced for the same text.
    #[error("entity recognition failed: {cause}")]
    Recognition {
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

impl Error {
    /// Returns true if this error came from the entity recognizer.
    #[must_use]
    pub const fn is_recognition(&self) -> bool {
        matches!(self, Self::Recognition { .. })
    }
}

/// Result type alias for piiguard operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("bad threshold".to_string());
        assert_eq!(err.to_string(), "invalid input: bad threshold");

        let err = Error::InvalidSpan {
            start: 4,
            end: 2,
            len: 10,
        };
        assert_eq!(err.to_string(), "invalid span 4..2 for text of 10 characters");

        let err = Error::Recognition {
            cause: "model offline".to_string(),
        };
        assert_eq!(err.to_string(), "entity recognition failed: model offline");
        assert!(err.is_recognition());

        let err = Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'read_config_file' failed: missing");
        assert!(!err.is_recognition());
    }
}
