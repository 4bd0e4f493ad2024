//! Entity recognition.
//!
//! Wraps an injected token-classification capability and turns its per-token
//! label stream into PII spans.
//!
//! # Token consolidation
//!
//! Tokens are walked in text order:
//! - zero-width tokens (special tokens carrying no text) are skipped,
//! - a token below the confidence threshold or labeled `O` closes the open span,
//! - a `B-` token, a token with no open span, or a token whose entity type
//!   differs from the open span starts a new span,
//! - anything else extends the open span, keeping the highest token score.
//!
//! The consolidated entity types are then remapped through a [`LabelMap`].

mod bulkhead;
mod http;
mod labels;
mod noop;

pub use bulkhead::{BulkheadClassifier, RecognizerBulkheadConfig};
pub use http::{HttpClassifierConfig, HttpTokenClassifier};
pub use labels::LabelMap;
pub use noop::NoopClassifier;

use crate::models::Span;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Label of tokens outside any entity.
pub const OUTSIDE_LABEL: &str = "O";

/// Default confidence threshold for recognizer spans.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// One classified token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPrediction {
    /// Start offset (codepoints).
    pub start: usize,
    /// End offset (codepoints, exclusive).
    pub end: usize,
    /// `O` or `<prefix>-<TYPE>`, e.g. `B-PER`, `I-LOC`.
    pub label: String,
    /// Confidence of the label.
    pub score: f64,
}

impl TokenPrediction {
    /// Creates a token prediction.
    #[must_use]
    pub fn new(start: usize, end: usize, label: impl Into<String>, score: f64) -> Self {
        Self {
            start,
            end,
            label: label.into(),
            score,
        }
    }
}

/// Trait for token classifiers.
///
/// Implementations are shared across threads; one that cannot be invoked
/// concurrently should be wrapped in a [`BulkheadClassifier`] with a single
/// permit.
pub trait TokenClassifier: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str {
        "classifier"
    }

    /// Classifies every token of `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying model cannot process the input.
    fn classify(&self, text: &str) -> Result<Vec<TokenPrediction>>;
}

impl<C: TokenClassifier + ?Sized> TokenClassifier for Arc<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn classify(&self, text: &str) -> Result<Vec<TokenPrediction>> {
        (**self).classify(text)
    }
}

impl<C: TokenClassifier + ?Sized> TokenClassifier for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn classify(&self, text: &str) -> Result<Vec<TokenPrediction>> {
        (**self).classify(text)
    }
}

/// An entity before category remapping.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawEntity {
    pub start: usize,
    pub end: usize,
    pub entity: String,
    pub score: f64,
}

/// Splits `B-PER` into (`Some("B")`, `"PER"`); a label without a separator
/// is its own entity type.
fn split_tag(label: &str) -> (Option<&str>, &str) {
    match label.split_once('-') {
        Some((prefix, entity)) => (Some(prefix), entity),
        None => (None, label),
    }
}

/// Consolidates adjacent same-entity tokens into entities.
pub(crate) fn consolidate(tokens: &[TokenPrediction], threshold: f64) -> Vec<RawEntity> {
    let mut entities = Vec::new();
    let mut current: Option<RawEntity> = None;

    for token in tokens {
        if token.end <= token.start {
            continue;
        }

        if token.score < threshold || token.label == OUTSIDE_LABEL {
            entities.extend(current.take());
            continue;
        }

        let (prefix, entity) = split_tag(&token.label);
        let starts_new = prefix == Some("B")
            || current.as_ref().is_none_or(|open| open.entity != entity);

        if starts_new {
            entities.extend(current.take());
            current = Some(RawEntity {
                start: token.start,
                end: token.end,
                entity: entity.to_string(),
                score: token.score,
            });
        } else if let Some(open) = current.as_mut() {
            open.end = token.end;
            open.score = open.score.max(token.score);
        }
    }

    entities.extend(current);
    entities
}

/// Turns classifier output into PII spans.
#[derive(Clone)]
pub struct EntityRecognizer {
    classifier: Arc<dyn TokenClassifier>,
    labels: LabelMap,
}

impl EntityRecognizer {
    /// Creates a recognizer over `classifier` with the built-in label map.
    #[must_use]
    pub fn new(classifier: Arc<dyn TokenClassifier>) -> Self {
        Self {
            classifier,
            labels: LabelMap::new(),
        }
    }

    /// Replaces the label map.
    #[must_use]
    pub fn with_label_map(mut self, labels: LabelMap) -> Self {
        self.labels = labels;
        self
    }

    /// Returns the classifier name.
    #[must_use]
    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Detects entity spans at or above `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`] if the classifier fails.
    pub fn detect(&self, text: &str, threshold: f64) -> Result<Vec<Span>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut tokens = self.classifier.classify(text).map_err(|e| match e {
            Error::Recognition { .. } => e,
            other => Error::Recognition {
                cause: other.to_string(),
            },
        })?;
        // Consolidation walks tokens in text order.
        tokens.sort_by_key(|token| (token.start, token.end));

        let spans: Vec<Span> = consolidate(&tokens, threshold)
            .into_iter()
            .filter_map(|raw| match self.labels.resolve(&raw.entity) {
                Some(label) => Some(Span::new(raw.start, raw.end, label, raw.score)),
                None => {
                    tracing::debug!(
                        classifier = self.classifier.name(),
                        tag = %raw.entity,
                        "Dropping unmapped recognizer label"
                    );
                    None
                },
            })
            .collect();

        tracing::debug!(
            classifier = self.classifier.name(),
            tokens = tokens.len(),
            spans = spans.len(),
            "Entity recognition complete"
        );

        Ok(spans)
    }
}

impl std::fmt::Debug for EntityRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRecognizer")
            .field("classifier", &self.classifier.name())
            .field("labels", &self.labels)
            .finish()
    }
}
