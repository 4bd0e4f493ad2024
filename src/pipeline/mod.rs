//! Detection and redaction pipeline.
//!
//! Pattern detectors and the entity recognizer run independently over the
//! same text. Their candidates are validated against the text length, merged
//! into one non-overlapping set and handed to the redaction engine.
//!
//! A recognizer failure does not discard pattern results: [`Analysis`] and
//! [`Redaction`] carry the pattern results together with the failure. With
//! [`PipelineConfig::strict_recognizer`] set the failure is returned instead.

mod merge;
mod redaction;

pub use merge::merge;
pub use redaction::{Redaction, redact};

use crate::models::{Detection, PiiCategory, RedactionPolicy, Span};
use crate::patterns::PatternDetector;
use crate::recognizer::{DEFAULT_THRESHOLD, EntityRecognizer};
use crate::text::CharIndex;
use crate::{Error, Result};

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Minimum recognizer confidence, in `[0, 1]`.
    pub threshold: f64,
    /// Placeholder policy for redaction-mode output.
    pub policy: RedactionPolicy,
    /// Return recognizer failures as errors instead of degrading to
    /// pattern-only results.
    pub strict_recognizer: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            policy: RedactionPolicy::default(),
            strict_recognizer: false,
        }
    }
}

impl PipelineConfig {
    /// Sets the recognizer threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the redaction policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RedactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets strict recognizer mode.
    #[must_use]
    pub const fn with_strict_recognizer(mut self, strict: bool) -> Self {
        self.strict_recognizer = strict;
        self
    }

    /// Checks that the threshold is a finite value in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an out-of-range threshold.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)
    }
}

/// Checks that `threshold` is a finite value in `[0, 1]`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an out-of-range threshold.
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "threshold must be between 0 and 1, got {threshold}"
        )))
    }
}

/// Final spans for one text.
#[derive(Debug)]
pub struct Analysis {
    /// Merged, non-overlapping spans ascending by start.
    pub spans: Vec<Span>,
    /// Recognizer failure, if the spans are pattern-only because of it.
    pub recognizer_error: Option<Error>,
}

impl Analysis {
    /// Returns true if every detector contributed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.recognizer_error.is_none()
    }
}

/// Runs detection, merging and redaction.
#[derive(Debug, Clone)]
pub struct PiiPipeline {
    patterns: PatternDetector,
    recognizer: Option<EntityRecognizer>,
    config: PipelineConfig,
}

impl PiiPipeline {
    /// Creates a pattern-only pipeline.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            patterns: PatternDetector::new(),
            recognizer: None,
            config,
        }
    }

    /// Adds an entity recognizer.
    #[must_use]
    pub fn with_recognizer(mut self, recognizer: EntityRecognizer) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Replaces the pattern detector.
    #[must_use]
    pub fn with_patterns(mut self, patterns: PatternDetector) -> Self {
        self.patterns = patterns;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the recognizer, if one is configured.
    #[must_use]
    pub const fn recognizer(&self) -> Option<&EntityRecognizer> {
        self.recognizer.as_ref()
    }

    /// Detects and merges all spans in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`] only in strict recognizer mode.
    pub fn analyze(&self, text: &str) -> Result<Analysis> {
        let index = CharIndex::new(text);

        let pattern_spans = self.patterns.detect_indexed(&index);
        metrics::counter!("pii_spans_detected_total", "source" => "pattern")
            .increment(pattern_spans.len() as u64);

        let mut candidates = pattern_spans;
        let mut recognizer_error = None;

        if let Some(recognizer) = &self.recognizer {
            match recognizer.detect(text, self.config.threshold) {
                Ok(spans) => {
                    metrics::counter!("pii_spans_detected_total", "source" => "recognizer")
                        .increment(spans.len() as u64);
                    candidates.extend(spans);
                },
                Err(e) => {
                    metrics::counter!("pii_recognizer_failures_total").increment(1);
                    if self.config.strict_recognizer {
                        tracing::error!(
                            classifier = recognizer.classifier_name(),
                            error = %e,
                            "Entity recognition failed"
                        );
                        return Err(e);
                    }
                    tracing::warn!(
                        classifier = recognizer.classifier_name(),
                        error = %e,
                        "Entity recognition failed, using pattern results only"
                    );
                    recognizer_error = Some(e);
                },
            }
        }

        let candidates = retain_valid(candidates, index.char_len());
        let candidate_count = candidates.len();
        let spans = merge(candidates);

        tracing::debug!(
            text_len = index.char_len(),
            candidates = candidate_count,
            spans = spans.len(),
            "Analyzed text"
        );

        Ok(Analysis {
            spans,
            recognizer_error,
        })
    }

    /// Detects spans and substitutes them using `policy`.
    ///
    /// A recognizer failure outside strict mode is reported in
    /// [`Redaction::recognizer_error`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`] only in strict recognizer mode.
    pub fn process_with(&self, text: &str, policy: &RedactionPolicy) -> Result<Redaction> {
        let analysis = self.analyze(text)?;
        let mut result = redact(text, &analysis.spans, policy);
        result.recognizer_error = analysis.recognizer_error;
        for detection in &result.detections {
            metrics::counter!("pii_detections_total", "label" => detection.label.clone())
                .increment(1);
        }
        Ok(result)
    }

    /// Detects spans and substitutes them using the configured policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`] only in strict recognizer mode.
    pub fn process(&self, text: &str) -> Result<Redaction> {
        self.process_with(text, &self.config.policy)
    }

    /// Returns detection records ascending by start.
    ///
    /// Outside strict mode a recognizer failure yields pattern-only output
    /// here; use [`PiiPipeline::process`] to observe it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`] only in strict recognizer mode.
    pub fn detect(&self, text: &str) -> Result<Vec<Detection>> {
        Ok(self.process(text)?.detections)
    }

    /// Returns `text` with every span replaced by its category placeholder.
    ///
    /// Outside strict mode a recognizer failure yields pattern-only output
    /// here; use [`PiiPipeline::process`] to observe it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`] only in strict recognizer mode.
    pub fn redact(&self, text: &str) -> Result<String> {
        Ok(self.process(text)?.redacted)
    }

    /// Like [`PiiPipeline::redact`] with per-call placeholder overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`] only in strict recognizer mode.
    pub fn redact_with<I>(&self, text: &str, overrides: I) -> Result<String>
    where
        I: IntoIterator<Item = (PiiCategory, String)>,
    {
        let policy = self.config.policy.with_overrides(overrides);
        Ok(self.process_with(text, &policy)?.redacted)
    }
}

/// Drops spans that do not fit the text.
fn retain_valid(spans: Vec<Span>, text_len: usize) -> Vec<Span> {
    spans
        .into_iter()
        .filter(|span| match span.validate(text_len) {
            Ok(()) => true,
            Err(e) => {
                metrics::counter!("pii_spans_rejected_total").increment(1);
                tracing::warn!(label = %span.label, error = %e, "Rejected invalid span");
                false
            },
        })
        .collect()
}
