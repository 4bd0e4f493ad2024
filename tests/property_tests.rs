//! Property-based tests for span merging and redaction.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Merging is idempotent
//! - Merged spans never overlap
//! - Redaction leaks none of the detected originals
//! - The checksum validator is total

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use piiguard::models::{PiiCategory, RedactionPolicy, Span};
use piiguard::patterns::luhn;
use piiguard::pipeline::{merge, redact};
use piiguard::{PiiPipeline, PipelineConfig};
use proptest::prelude::*;

fn category() -> impl Strategy<Value = PiiCategory> {
    prop::sample::select(PiiCategory::builtin().to_vec())
}

fn span() -> impl Strategy<Value = Span> {
    (0usize..200, 1usize..40, category(), 0.0f64..=1.0)
        .prop_map(|(start, len, label, score)| Span::new(start, start + len, label, score))
}

proptest! {
    /// Property: merging a merged set changes nothing.
    #[test]
    fn prop_merge_idempotent(spans in prop::collection::vec(span(), 0..30)) {
        let once = merge(spans);
        let twice = merge(once.clone());
        prop_assert_eq!(once, twice);
    }

    /// Property: merged spans are ordered and disjoint.
    #[test]
    fn prop_merge_non_overlapping(spans in prop::collection::vec(span(), 0..30)) {
        let merged = merge(spans);
        for pair in merged.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
    }

    /// Property: every merged span is one of the inputs.
    #[test]
    fn prop_merge_output_is_subset(spans in prop::collection::vec(span(), 0..30)) {
        let merged = merge(spans.clone());
        prop_assert!(merged.len() <= spans.len());
        for span in &merged {
            prop_assert!(spans.contains(span));
        }
    }

    /// Property: the redacted text contains no detected original.
    #[test]
    fn prop_redaction_does_not_leak(
        words in prop::collection::vec("[a-z]{3,8}", 1..6),
        local in "[a-z]{4,10}",
        domain in "[a-z]{4,10}",
    ) {
        let email = format!("{local}@{domain}.com");
        let text = format!("{} {email} {}", words.join(" "), words.join(" "));

        let pipeline = PiiPipeline::new(PipelineConfig::default());
        let result = pipeline.process(&text).unwrap();

        prop_assert_eq!(result.detections.len(), 1);
        for detection in &result.detections {
            prop_assert!(!result.redacted.contains(&detection.original_text));
            prop_assert!(!result.keyed.contains(&detection.original_text));
        }
    }

    /// Property: redacting disjoint spans removes every original.
    #[test]
    fn prop_disjoint_spans_fully_replaced(text in "[A-Z]{40,80}", cuts in prop::collection::vec(1usize..8, 1..6)) {
        let mut spans = Vec::new();
        let mut cursor = 0;
        for len in cuts {
            let start = cursor + 1;
            let end = start + len;
            if end > text.len() {
                break;
            }
            spans.push(Span::pattern(start, end, PiiCategory::Person));
            cursor = end;
        }

        let result = redact(&text, &spans, &RedactionPolicy::default());
        prop_assert_eq!(result.detections.len(), spans.len());
        let placeholders = result.redacted.matches("[NAME]").count();
        prop_assert_eq!(placeholders, spans.len());
    }

    /// Property: keys count up per category in text order.
    #[test]
    fn prop_keys_are_sequential(count in 1usize..10) {
        let text = vec!["Alex"; count].join(" ");
        let spans: Vec<_> = (0..count)
            .map(|i| Span::new(i * 5, i * 5 + 4, PiiCategory::Person, 0.9))
            .collect();
        let result = redact(&text, &spans, &RedactionPolicy::default());
        for (i, detection) in result.detections.iter().enumerate() {
            prop_assert_eq!(&detection.key, &format!("Person_{}", i + 1));
        }
    }

    /// Property: the checksum validator never panics.
    #[test]
    fn prop_luhn_total(s in "\\PC{0,40}") {
        let _ = luhn::is_valid(&s);
    }

    /// Property: changing the check digit of a valid number invalidates it.
    #[test]
    fn prop_luhn_detects_single_digit_change(delta in 1u32..10) {
        let valid = "4111111111111111";
        let last = valid.chars().last().unwrap().to_digit(10).unwrap();
        let altered = format!("{}{}", &valid[..15], (last + delta) % 10);
        prop_assert!(luhn::is_valid(valid));
        prop_assert!(!luhn::is_valid(&altered));
    }

    /// Property: detection never panics and spans fit the text.
    #[test]
    fn prop_detect_spans_within_text(text in "\\PC{0,120}") {
        let pipeline = PiiPipeline::new(PipelineConfig::default());
        let len = text.chars().count();
        for detection in pipeline.detect(&text).unwrap() {
            prop_assert!(detection.start < detection.end);
            prop_assert!(detection.end <= len);
        }
    }
}
