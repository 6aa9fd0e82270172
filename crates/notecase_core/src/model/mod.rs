//! Domain model for categorized markdown notes.
//!
//! # Responsibility
//! - Define categories, notes, parsed blocks and UI display states.
//!
//! # Invariants
//! - A note's raw text is the single source of truth; blocks are always
//!   derived from it by `parser::parse`.
//! - A note is identified by `(category, index)` for the lifetime of a scan.

pub mod block;
pub mod category;
pub mod display_state;
pub mod note;
