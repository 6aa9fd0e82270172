//! Storage layer for categorized note files.
//!
//! # Responsibility
//! - Scan the storage root into an immutable category inventory.
//! - Define the backend contract and its filesystem implementation.
//!
//! # Invariants
//! - The filesystem is the source of truth; no index or metadata file is
//!   persisted.
//! - Writes replace files atomically.

mod atomic;
pub mod category_index;
pub mod fs_backend;
