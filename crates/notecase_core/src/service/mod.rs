//! Note use-case services.
//!
//! # Responsibility
//! - Run the edit/commit workflow on top of a `NoteBackend`.
//! - Keep storage I/O off the presentation thread.
//!
//! # Invariants
//! - Services return success/failure values only; mapping them onto
//!   `DisplayState` belongs to the caller.

pub mod editable_note;
pub mod worker;
