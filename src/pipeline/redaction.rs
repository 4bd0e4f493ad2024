//! Instance keys and text substitution.

use crate::Error;
use crate::models::{Detection, RedactionPolicy, Span, round_score};
use crate::text::CharIndex;
use std::collections::BTreeMap;

/// Output of [`redact`].
#[derive(Debug)]
pub struct Redaction {
    /// Text with every span replaced by its category placeholder.
    pub redacted: String,
    /// Text with every span replaced by its instance key.
    pub keyed: String,
    /// One record per substituted span, ascending by start.
    pub detections: Vec<Detection>,
    /// Recognizer failure when only pattern spans were substituted.
    pub recognizer_error: Option<Error>,
}

impl Redaction {
    /// Returns true if the entity recognizer contributed to the result.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.recognizer_error.is_none()
    }
}

/// Replaces `spans` in `text`.
///
/// Spans are expected to be the non-overlapping output of the merger. A span
/// that overlaps an earlier one or does not fit the text is skipped. Keys are
/// numbered per category from left to right.
#[must_use]
pub fn redact(text: &str, spans: &[Span], policy: &RedactionPolicy) -> Redaction {
    let index = CharIndex::new(text);
    let mut ordered: Vec<&Span> = spans.iter().collect();
    ordered.sort_by_key(|span| (span.start, span.end));

    let mut counters: BTreeMap<_, usize> = BTreeMap::new();
    let mut detections = Vec::with_capacity(ordered.len());
    let mut redacted = String::with_capacity(text.len());
    let mut keyed = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut cursor_byte = 0;

    for span in ordered {
        if span.is_empty() || span.start < cursor {
            tracing::debug!(start = span.start, end = span.end, "Skipping overlapping span");
            continue;
        }
        let (Some(from), Some(original)) = (
            index.byte_offset(span.start),
            index.slice(span.start, span.end),
        ) else {
            tracing::debug!(start = span.start, end = span.end, "Skipping out-of-range span");
            continue;
        };

        let counter = counters.entry(span.label.clone()).or_insert(0);
        *counter += 1;
        let key = format!("{}_{}", span.label.key_label(), counter);

        let gap = &text[cursor_byte..from];
        redacted.push_str(gap);
        redacted.push_str(policy.placeholder(&span.label));
        keyed.push_str(gap);
        keyed.push_str(&key);

        detections.push(Detection {
            key: key.clone(),
            label: span.label.as_str().to_string(),
            score: round_score(span.score),
            original_text: original.to_string(),
            redacted_text: key,
            start: span.start,
            end: span.end,
        });
        cursor = span.end;
        cursor_byte = from + original.len();
    }

    redacted.push_str(&text[cursor_byte..]);
    keyed.push_str(&text[cursor_byte..]);

    Redaction {
        redacted,
        keyed,
        detections,
        recognizer_error: None,
    }
}
