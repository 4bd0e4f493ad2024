//! Data models for piiguard.
//!
//! Spans are the unit every detector produces; detections and redaction
//! policies are derived from them per call.

mod category;
mod detection;
mod policy;
mod span;

pub use category::PiiCategory;
pub use detection::Detection;
pub(crate) use detection::round_score;
pub use policy::{DEFAULT_PLACEHOLDER, RedactionPolicy};
pub use span::Span;
