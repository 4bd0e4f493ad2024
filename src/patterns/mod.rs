//! Pattern-based PII detection.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]
//!
//! Stateless detectors for structurally regular PII. Each detector scans the
//! full text on its own and never sees another detector's output.

mod bounded;
pub mod luhn;

use crate::models::{PiiCategory, Span};
use crate::text::CharIndex;
use bounded::digit_bounded_matches;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

// Note: These patterns are static and guaranteed to compile, so expect() is safe
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}")
        .expect("static regex: email pattern")
});

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("static regex: URL pattern"));

/// Dotted quad without range validation: `999.999.999.999` matches.
static IPV4_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("static regex: IPv4 pattern")
});

/// Eight-digit local numbers starting 3/6/8/9, optional +65 prefix.
static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+65[\s-]?)?[3689][0-9]{3}[\s-]?[0-9]{4}").expect("static regex: phone pattern")
});

static PHONE_FULL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:\+65[\s-]?)?[3689][0-9]{3}[\s-]?[0-9]{4})$")
        .expect("static regex: anchored phone pattern")
});

/// NRIC/FIN style identifier: prefix letter, seven digits, check letter.
static NATIONAL_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[STFGM][0-9]{7}[A-Z]\b").expect("static regex: national ID pattern")
});

/// Coarse card match; candidates are confirmed by [`luhn::is_valid`].
static CARD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[0-9][ -]?){13,19}").expect("static regex: card pattern")
});

static CARD_FULL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:[0-9][ -]?){13,19})$").expect("static regex: anchored card pattern")
});

/// A single pattern detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Email addresses.
    Email,
    /// `http(s)://` URLs.
    Url,
    /// IPv4 addresses.
    Ip,
    /// Phone numbers.
    Phone,
    /// National identity numbers.
    NationalId,
    /// Checksum-validated payment card numbers.
    CreditCard,
}

impl PatternKind {
    /// All pattern detectors.
    pub const ALL: [Self; 6] = [
        Self::Email,
        Self::Url,
        Self::Ip,
        Self::Phone,
        Self::NationalId,
        Self::CreditCard,
    ];

    /// Category assigned to matches of this detector.
    #[must_use]
    pub const fn category(self) -> PiiCategory {
        match self {
            Self::Email => PiiCategory::Email,
            Self::Url => PiiCategory::Url,
            Self::Ip => PiiCategory::Ip,
            Self::Phone => PiiCategory::Phone,
            Self::NationalId => PiiCategory::NationalId,
            Self::CreditCard => PiiCategory::CreditCard,
        }
    }

    /// Byte ranges of all matches in `text`.
    fn byte_ranges(self, text: &str) -> Vec<Range<usize>> {
        match self {
            Self::Email => find_all(&EMAIL_REGEX, text),
            Self::Url => find_all(&URL_REGEX, text),
            Self::Ip => find_all(&IPV4_REGEX, text),
            Self::NationalId => find_all(&NATIONAL_ID_REGEX, text),
            Self::Phone => digit_bounded_matches(text, &PHONE_REGEX, &PHONE_FULL_REGEX),
            Self::CreditCard => card_ranges(text),
        }
    }

    /// Runs this detector over an indexed text.
    #[must_use]
    pub fn detect(self, index: &CharIndex<'_>) -> Vec<Span> {
        let category = self.category();
        self.byte_ranges(index.text())
            .into_iter()
            .map(|range| {
                Span::pattern(
                    index.char_offset(range.start),
                    index.char_offset(range.end),
                    category.clone(),
                )
            })
            .collect()
    }
}

fn find_all(regex: &Regex, text: &str) -> Vec<Range<usize>> {
    regex.find_iter(text).map(|m| m.range()).collect()
}

/// Card candidates with trailing separators trimmed, kept only if the
/// checksum holds.
fn card_ranges(text: &str) -> Vec<Range<usize>> {
    digit_bounded_matches(text, &CARD_REGEX, &CARD_FULL_REGEX)
        .into_iter()
        .filter_map(|range| {
            let candidate = text[range.clone()].trim_end_matches([' ', '-']);
            luhn::is_valid(candidate).then(|| range.start..range.start + candidate.len())
        })
        .collect()
}

/// Runs a configurable set of pattern detectors.
#[derive(Debug, Clone)]
pub struct PatternDetector {
    kinds: Vec<PatternKind>,
}

impl PatternDetector {
    /// Creates a detector running every pattern.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: PatternKind::ALL.to_vec(),
        }
    }

    /// Creates a detector running only the given patterns.
    #[must_use]
    pub fn with_kinds(kinds: impl IntoIterator<Item = PatternKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Returns all candidate spans found in `text`.
    #[must_use]
    pub fn detect(&self, text: &str) -> Vec<Span> {
        self.detect_indexed(&CharIndex::new(text))
    }

    /// Returns all candidate spans for an already indexed text.
    #[must_use]
    pub fn detect_indexed(&self, index: &CharIndex<'_>) -> Vec<Span> {
        let mut spans = Vec::new();
        for kind in &self.kinds {
            let found = kind.detect(index);
            if !found.is_empty() {
                tracing::trace!(pattern = ?kind, count = found.len(), "Pattern matched");
            }
            spans.extend(found);
        }
        spans
    }

    /// Checks if text contains any pattern match.
    #[must_use]
    pub fn contains_pii(&self, text: &str) -> bool {
        !self.detect(text).is_empty()
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn matches(kind: PatternKind, text: &str) -> Vec<String> {
        let index = CharIndex::new(text);
        kind.detect(&index)
            .iter()
            .filter_map(|span| index.slice(span.start, span.end).map(str::to_string))
            .collect()
    }

    #[test_case("Contact me at john.doe@example.com", "john.doe@example.com" ; "simple")]
    #[test_case("mail first.last+tag@mail.example.co.uk now", "first.last+tag@mail.example.co.uk" ; "plus and subdomains")]
    fn test_detect_email(text: &str, expected: &str) {
        assert_eq!(matches(PatternKind::Email, text), vec![expected]);
    }

    #[test]
    fn test_email_requires_tld() {
        assert!(matches(PatternKind::Email, "user@localhost").is_empty());
        assert!(matches(PatternKind::Email, "user@host.c").is_empty());
    }

    #[test]
    fn test_detect_url() {
        assert_eq!(
            matches(PatternKind::Url, "visit https://example.com/a?b=1 today"),
            vec!["https://example.com/a?b=1"]
        );
        assert_eq!(
            matches(PatternKind::Url, "http://x.io"),
            vec!["http://x.io"]
        );
        assert!(matches(PatternKind::Url, "ftp://example.com").is_empty());
    }

    #[test_case("Server IP: 203.0.113.42", "203.0.113.42" ; "public address")]
    #[test_case("bogus 999.999.999.999 quad", "999.999.999.999" ; "no range validation")]
    fn test_detect_ip(text: &str, expected: &str) {
        assert_eq!(matches(PatternKind::Ip, text), vec![expected]);
    }

    #[test]
    fn test_ip_needs_four_groups() {
        assert!(matches(PatternKind::Ip, "version 1.2.3").is_empty());
    }

    #[test_case("call 9123 4567 now", "9123 4567" ; "space separator")]
    #[test_case("call +65 9123 4567", "+65 9123 4567" ; "country code")]
    #[test_case("call +65-6123-4567", "+65-6123-4567" ; "hyphens")]
    #[test_case("call 81234567.", "81234567" ; "no separator")]
    fn test_detect_phone(text: &str, expected: &str) {
        assert_eq!(matches(PatternKind::Phone, text), vec![expected]);
    }

    #[test_case("call 1234 5678" ; "disallowed first digit")]
    #[test_case("order 912345678 shipped" ; "inside longer number")]
    #[test_case("ref 0912345678" ; "preceded by digit")]
    fn test_phone_rejections(text: &str) {
        assert!(matches(PatternKind::Phone, text).is_empty());
    }

    #[test_case("NRIC S1234567D please", "S1234567D" ; "upper case")]
    #[test_case("fin g7654321x", "g7654321x" ; "lower case")]
    fn test_detect_national_id(text: &str, expected: &str) {
        assert_eq!(matches(PatternKind::NationalId, text), vec![expected]);
    }

    #[test]
    fn test_national_id_word_bounded() {
        assert!(matches(PatternKind::NationalId, "XS1234567D").is_empty());
        assert!(matches(PatternKind::NationalId, "A1234567D").is_empty());
    }

    #[test]
    fn test_detect_credit_card() {
        assert_eq!(
            matches(PatternKind::CreditCard, "Card: 4111 1111 1111 1111 exp 12/29"),
            vec!["4111 1111 1111 1111"]
        );
        assert_eq!(
            matches(PatternKind::CreditCard, "card 5555-5555-5555-4444."),
            vec!["5555-5555-5555-4444"]
        );
    }

    #[test]
    fn test_credit_card_requires_checksum() {
        assert!(matches(PatternKind::CreditCard, "Card: 4111111111111112").is_empty());
    }

    #[test]
    fn test_credit_card_not_inside_longer_run() {
        assert!(matches(PatternKind::CreditCard, "id 411111111111111111111").is_empty());
    }

    #[test]
    fn test_offsets_are_codepoints() {
        let detector = PatternDetector::with_kinds([PatternKind::Email]);
        let spans = detector.detect("日本 a@b.io");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 3);
        assert_eq!(spans[0].end, 9);
        assert!((spans[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_detector_runs_every_pattern() {
        let detector = PatternDetector::new();
        let spans = detector.detect(
            "alex@ex.com, https://ex.com, 10.0.0.1, +65 9123 4567, S1234567D, 4111 1111 1111 1111",
        );
        let mut labels: Vec<_> = spans.iter().map(|s| s.label.clone()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(
            labels,
            vec![
                PiiCategory::Email,
                PiiCategory::Url,
                PiiCategory::Ip,
                PiiCategory::Phone,
                PiiCategory::NationalId,
                PiiCategory::CreditCard,
            ]
        );
    }

    #[test]
    fn test_no_pii() {
        let detector = PatternDetector::new();
        assert!(!detector.contains_pii("This is just regular text without PII."));
        assert!(detector.detect("").is_empty());
    }
}
