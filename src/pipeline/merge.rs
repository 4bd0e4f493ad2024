//! Greedy span conflict resolution.

use crate::models::Span;

/// Resolves overlapping candidates into a non-overlapping, start-ordered set.
///
/// Candidates are sorted by start ascending, then end descending, and walked
/// once. A candidate that starts at or before the end of the last accepted
/// span conflicts with it and replaces it only when it is longer or scores
/// higher. Touching spans (`candidate.start == last.end`) conflict too.
///
/// The pass is greedy: a replaced span is not reconsidered against spans
/// accepted before it.
#[must_use]
pub fn merge(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.end.cmp(&a.end)));

    let mut out: Vec<Span> = Vec::with_capacity(spans.len());
    for candidate in spans {
        match out.last_mut() {
            Some(last) if candidate.start <= last.end => {
                if candidate.len() > last.len() || candidate.score > last.score {
                    *last = candidate;
                }
            },
            _ => out.push(candidate),
        }
    }
    out
}
