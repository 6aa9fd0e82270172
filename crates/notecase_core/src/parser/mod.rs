//! Markdown parsing entry points.
//!
//! # Responsibility
//! - Turn raw note text into typed blocks without any I/O.
//! - Never reject input: unmatched content degrades to paragraphs.
//! - Derive list previews from raw text.
//!
//! # Invariants
//! - `parse(text)` is deterministic for equal `text`.

pub mod markdown;
pub mod preview;

pub use markdown::{parse, parse_report, DegradeReason, Degradation, ParseReport};
pub use preview::derive_title_preview;
