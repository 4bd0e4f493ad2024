//! Digit-adjacency bounded matching.
//!
//! The `regex` crate has no look-around, so "not preceded or followed by a
//! digit" is enforced here. A candidate preceded by a digit is skipped and the
//! search resumes one character later. A candidate followed by a digit is
//! shortened to the longest prefix that still fully matches and is not followed
//! by a digit, which is where a backtracking engine with look-ahead would land.

use regex::Regex;
use std::ops::Range;

/// Finds byte ranges of `finder` matches that are not adjacent to digits.
///
/// `full` must be the same pattern anchored with `^(?:...)$`.
pub(super) fn digit_bounded_matches(text: &str, finder: &Regex, full: &Regex) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(m) = finder.find_at(text, pos) else {
            break;
        };
        let start = m.start();

        if preceded_by_digit(text, start) {
            pos = next_boundary(text, start);
            continue;
        }

        if let Some(end) = longest_bounded_end(text, start, m.end(), full) {
            found.push(start..end);
            pos = end;
        } else {
            pos = next_boundary(text, start);
        }
    }

    found
}

fn longest_bounded_end(text: &str, start: usize, mut end: usize, full: &Regex) -> Option<usize> {
    while end > start {
        if !followed_by_digit(text, end) && full.is_match(&text[start..end]) {
            return Some(end);
        }
        end = prev_boundary(text, end);
    }
    None
}

fn preceded_by_digit(text: &str, at: usize) -> bool {
    text[..at]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_digit())
}

fn followed_by_digit(text: &str, at: usize) -> bool {
    text[at..].chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn next_boundary(text: &str, at: usize) -> usize {
    at + text[at..].chars().next().map_or(1, char::len_utf8)
}

fn prev_boundary(text: &str, at: usize) -> usize {
    at - text[..at].chars().next_back().map_or(1, char::len_utf8)
}
