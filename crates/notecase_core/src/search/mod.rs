//! Cross-note full-text search.
//!
//! # Responsibility
//! - Build a derived FTS5 index from an inventory snapshot.
//! - Keep query escaping, result shaping and the index schema inside core.

pub mod fts;
pub mod schema;
