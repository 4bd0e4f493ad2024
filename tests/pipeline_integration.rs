//! End-to-end tests for the detection and redaction pipeline.
//!
//! The entity recognizer is replaced by fixed token streams so results are
//! deterministic.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use piiguard::models::{PiiCategory, RedactionPolicy};
use piiguard::recognizer::{
    BulkheadClassifier, EntityRecognizer, LabelMap, RecognizerBulkheadConfig, TokenClassifier,
    TokenPrediction,
};
use piiguard::{Error, PiiPipeline, PipelineConfig, Result};
use std::sync::Arc;

/// Returns the same tokens for every input.
struct FixedClassifier(Vec<TokenPrediction>);

impl TokenClassifier for FixedClassifier {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn classify(&self, _text: &str) -> Result<Vec<TokenPrediction>> {
        Ok(self.0.clone())
    }
}

struct OfflineClassifier;

impl TokenClassifier for OfflineClassifier {
    fn classify(&self, _text: &str) -> Result<Vec<TokenPrediction>> {
        Err(Error::Recognition {
            cause: "connect error: connection refused".to_string(),
        })
    }
}

fn token(start: usize, end: usize, label: &str, score: f64) -> TokenPrediction {
    TokenPrediction::new(start, end, label, score)
}

fn pipeline(tokens: Vec<TokenPrediction>) -> PiiPipeline {
    PiiPipeline::new(PipelineConfig::default())
        .with_recognizer(EntityRecognizer::new(Arc::new(FixedClassifier(tokens))))
}

#[test]
fn test_email_and_url() {
    let pipeline = pipeline(Vec::new());
    let text = "Contact alex@example.com or visit https://example.com";

    let detections = pipeline.detect(text).unwrap();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].label, "EMAIL");
    assert_eq!(detections[0].key, "Email_1");
    assert_eq!(detections[0].original_text, "alex@example.com");
    assert_eq!(detections[1].label, "URL");
    assert_eq!(detections[1].key, "Url_1");
    assert_eq!(detections[1].original_text, "https://example.com");

    assert_eq!(
        pipeline.redact(text).unwrap(),
        "Contact [EMAIL] or visit [URL]"
    );
}

#[test]
fn test_non_luhn_card_not_detected() {
    let pipeline = pipeline(Vec::new());
    let detections = pipeline.detect("Card: 4111111111111112").unwrap();
    assert!(detections.iter().all(|d| d.label != "CREDIT_CARD"));
}

#[test]
fn test_luhn_card_redacted() {
    let pipeline = pipeline(Vec::new());
    let result = pipeline.process("Card: 4111 1111 1111 1111 exp 12/29").unwrap();
    assert_eq!(result.redacted, "Card: [CARD] exp 12/29");
    assert_eq!(result.keyed, "Card: Credit_card_1 exp 12/29");
}

#[test]
fn test_same_start_keeps_longer_recognizer_span() {
    // Recognizer claims "alex@example.com today" as one organization.
    let text = "Reach alex@example.com today";
    let pipeline = pipeline(vec![
        token(6, 22, "B-ORG", 0.7),
        token(23, 28, "I-ORG", 0.7),
    ]);

    let detections = pipeline.detect(text).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "ORG");
    assert_eq!((detections[0].start, detections[0].end), (6, 28));
}

#[test]
fn test_same_start_keeps_longer_pattern_span() {
    let text = "Reach alex@example.com today";
    let pipeline = pipeline(vec![token(6, 10, "B-PER", 0.95)]);

    let detections = pipeline.detect(text).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "EMAIL");
    assert!((detections[0].score - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_person_keys_follow_text_order() {
    // Tokens arrive out of order; keys must not.
    let text = "Alice met Bob";
    let pipeline = pipeline(vec![token(10, 13, "B-PER", 0.9), token(0, 5, "B-PER", 0.8)]);

    let detections = pipeline.detect(text).unwrap();
    let keyed: Vec<_> = detections
        .iter()
        .map(|d| (d.key.as_str(), d.original_text.as_str()))
        .collect();
    assert_eq!(keyed, vec![("Person_1", "Alice"), ("Person_2", "Bob")]);
}

#[test]
fn test_mixed_sources() {
    let text = "Alex Tan (S1234567D) emailed alex@example.com from 10.0.0.1";
    let pipeline = pipeline(vec![
        token(0, 4, "B-PER", 0.99),
        token(5, 8, "I-PER", 0.97),
        token(8, 9, "O", 0.99),
    ]);

    let result = pipeline.process(text).unwrap();
    assert_eq!(result.redacted, "[NAME] ([ID]) emailed [EMAIL] from [IP]");
    assert_eq!(
        result.keyed,
        "Person_1 (National_id_1) emailed Email_1 from Ip_1"
    );
    assert!((result.detections[0].score - 0.99).abs() < f64::EPSILON);
}

#[test]
fn test_recognizer_failure_degrades_to_patterns() {
    let pipeline = PiiPipeline::new(PipelineConfig::default())
        .with_recognizer(EntityRecognizer::new(Arc::new(OfflineClassifier)));

    let analysis = pipeline.analyze("Alex at alex@example.com").unwrap();
    assert_eq!(analysis.spans.len(), 1);
    assert_eq!(analysis.spans[0].label, PiiCategory::Email);
    assert!(analysis.recognizer_error.as_ref().is_some_and(Error::is_recognition));

    let result = pipeline.process("Alex at alex@example.com").unwrap();
    assert_eq!(result.redacted, "Alex at [EMAIL]");
    assert!(!result.is_complete());
    assert!(result.recognizer_error.is_some_and(|e| e.is_recognition()));
}

#[test]
fn test_strict_mode_surfaces_failure() {
    let pipeline = PiiPipeline::new(PipelineConfig::default().with_strict_recognizer(true))
        .with_recognizer(EntityRecognizer::new(Arc::new(OfflineClassifier)));

    let err = pipeline.redact("Alex at alex@example.com").unwrap_err();
    assert!(err.is_recognition());
}

#[test]
fn test_custom_label_mapping() {
    let text = "Born on 1 May 1990";
    let recognizer = EntityRecognizer::new(Arc::new(FixedClassifier(vec![
        token(8, 9, "B-DATE", 0.9),
        token(10, 13, "I-DATE", 0.9),
        token(14, 18, "I-DATE", 0.9),
    ])));

    let unmapped = PiiPipeline::new(PipelineConfig::default()).with_recognizer(recognizer.clone());
    assert!(unmapped.detect(text).unwrap().is_empty());

    let mapped = PiiPipeline::new(PipelineConfig::default()).with_recognizer(
        recognizer.with_label_map(LabelMap::new().with_mapping("DATE", PiiCategory::custom("DOB"))),
    );
    let result = mapped.process(text).unwrap();
    assert_eq!(result.redacted, "Born on [REDACTED]");
    assert_eq!(result.detections[0].key, "Dob_1");
}

#[test]
fn test_policy_overrides_per_call() {
    let pipeline = pipeline(vec![token(0, 4, "B-PER", 0.9)]);
    let text = "Alex uses alex@example.com";

    let redacted = pipeline
        .redact_with(
            text,
            [
                RedactionPolicy::parse_override("PERSON=<who>").unwrap(),
                RedactionPolicy::parse_override("email=<mail>").unwrap(),
            ],
        )
        .unwrap();
    assert_eq!(redacted, "<who> uses <mail>");
    assert_eq!(pipeline.redact(text).unwrap(), "[NAME] uses [EMAIL]");
}

#[test]
fn test_threshold_filters_recognizer_spans() {
    let tokens = vec![token(0, 4, "B-PER", 0.65)];
    let low = PiiPipeline::new(PipelineConfig::default().with_threshold(0.6))
        .with_recognizer(EntityRecognizer::new(Arc::new(FixedClassifier(tokens.clone()))));
    let high = PiiPipeline::new(PipelineConfig::default().with_threshold(0.9))
        .with_recognizer(EntityRecognizer::new(Arc::new(FixedClassifier(tokens))));

    assert_eq!(low.detect("Alex").unwrap().len(), 1);
    assert!(high.detect("Alex").unwrap().is_empty());
}

#[test]
fn test_bulkhead_wrapped_recognizer_shared_across_threads() {
    let classifier = BulkheadClassifier::new(
        FixedClassifier(vec![token(0, 4, "B-PER", 0.9)]),
        RecognizerBulkheadConfig::new().with_max_concurrent(1),
    );
    let pipeline = Arc::new(
        PiiPipeline::new(PipelineConfig::default())
            .with_recognizer(EntityRecognizer::new(Arc::new(classifier))),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || pipeline.redact("Alex called").unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "[NAME] called");
    }
}

#[test]
fn test_multibyte_offsets_are_codepoints() {
    let text = "Ünïcödé wrote to a@b.io";
    let pipeline = pipeline(vec![token(0, 7, "B-PER", 0.9)]);

    let detections = pipeline.detect(text).unwrap();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].original_text, "Ünïcödé");
    assert_eq!((detections[1].start, detections[1].end), (17, 23));
    assert_eq!(detections[1].original_text, "a@b.io");
    assert_eq!(pipeline.redact(text).unwrap(), "[NAME] wrote to [EMAIL]");
}

#[test]
fn test_empty_and_clean_text() {
    let pipeline = pipeline(Vec::new());
    assert!(pipeline.detect("").unwrap().is_empty());
    assert_eq!(
        pipeline.redact("Nothing sensitive here.").unwrap(),
        "Nothing sensitive here."
    );
}
