//! Edit/commit workflow over one note.
//!
//! # Responsibility
//! - Hold the mutable text buffer used by the EDIT and ADD views.
//! - Track whether the buffer diverges from what is on disk.
//! - Commit through a `NoteBackend` and hand back a freshly parsed note.
//!
//! # Invariants
//! - `edit_text == note.raw_text()` right after `from_note`.
//! - `is_dirty()` is exactly `edit_text != baseline`, where the baseline is
//!   the wrapped note text (or the empty string for a new note).
//! - A failed commit returns the draft unchanged inside `CommitFailure`.

use crate::error::NoteError;
use crate::model::note::MarkdownNote;
use crate::repo::fs_backend::NoteBackend;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
enum DraftTarget {
    Existing(MarkdownNote),
    New { category: String },
}

/// Mutable edit buffer wrapping an existing note or a note being added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableNote {
    target: DraftTarget,
    edit_text: String,
    dirty: bool,
}

/// Commit error carrying the untouched draft so the user can retry.
#[derive(Debug)]
pub struct CommitFailure {
    pub draft: EditableNote,
    pub error: NoteError,
}

impl CommitFailure {
    pub fn into_parts(self) -> (EditableNote, NoteError) {
        (self.draft, self.error)
    }
}

impl Display for CommitFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "commit failed: {}", self.error)
    }
}

impl Error for CommitFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl EditableNote {
    /// Starts editing `note`; the buffer is seeded with its raw text verbatim.
    pub fn from_note(note: MarkdownNote) -> Self {
        let edit_text = note.raw_text().to_string();
        Self {
            target: DraftTarget::Existing(note),
            edit_text,
            dirty: false,
        }
    }

    /// Starts composing a new note in `category` with an empty buffer.
    pub fn for_new_note(category: impl Into<String>) -> Self {
        Self {
            target: DraftTarget::New {
                category: category.into(),
            },
            edit_text: String::new(),
            dirty: false,
        }
    }

    pub fn edit_text(&self) -> &str {
        &self.edit_text
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_new(&self) -> bool {
        matches!(self.target, DraftTarget::New { .. })
    }

    pub fn category(&self) -> &str {
        match &self.target {
            DraftTarget::Existing(note) => note.category(),
            DraftTarget::New { category } => category,
        }
    }

    /// The wrapped note; `None` while adding a note.
    pub fn note(&self) -> Option<&MarkdownNote> {
        match &self.target {
            DraftTarget::Existing(note) => Some(note),
            DraftTarget::New { .. } => None,
        }
    }

    /// Replaces the buffer and recomputes the dirty flag.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.edit_text = text.into();
        self.dirty = self.edit_text != self.baseline();
    }

    /// Writes the buffer through `backend` when dirty.
    ///
    /// - Clean existing note: no write, returns the wrapped note unchanged.
    /// - Dirty existing note: `save_loaded_note`, then returns the note
    ///   re-parsed from the new text. A rescan that moved the note to another
    ///   index (or removed it) fails the commit with `NotFound(NoteFile)`.
    /// - New note: `create_note`; an empty buffer fails with `EmptyDraft`.
    ///
    /// # Errors
    /// Returns `CommitFailure` holding this draft unchanged.
    pub fn commit<B>(self, backend: &B) -> Result<MarkdownNote, CommitFailure>
    where
        B: NoteBackend + ?Sized,
    {
        let result = match &self.target {
            DraftTarget::Existing(note) if !self.dirty => Ok(note.clone()),
            DraftTarget::Existing(note) => backend
                .save_loaded_note(note, &self.edit_text)
                .map(|()| note.clone().with_raw_text(self.edit_text.as_str())),
            DraftTarget::New { .. } if self.edit_text.is_empty() => Err(NoteError::EmptyDraft),
            DraftTarget::New { category } => backend.create_note(category, &self.edit_text),
        };

        match result {
            Ok(note) => {
                info!(
                    "event=edit_commit module=service status=ok category={} index={} new={} wrote={}",
                    note.category(),
                    note.index(),
                    self.is_new(),
                    self.dirty
                );
                Ok(note)
            }
            Err(error) => {
                warn!(
                    "event=edit_commit module=service status=error category={} error_code={}",
                    self.category(),
                    error.error_code()
                );
                Err(CommitFailure { draft: self, error })
            }
        }
    }

    /// Drops the buffer without writing.
    pub fn discard(self) {
        info!(
            "event=edit_discard module=service status=ok category={} dirty={}",
            self.category(),
            self.dirty
        );
    }

    fn baseline(&self) -> &str {
        match &self.target {
            DraftTarget::Existing(note) => note.raw_text(),
            DraftTarget::New { .. } => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EditableNote;
    use crate::model::note::MarkdownNote;

    #[test]
    fn set_text_tracks_divergence_from_note() {
        let note = MarkdownNote::from_text("c", 0, "/tmp/c/a.md", "body\n");
        let mut draft = EditableNote::from_note(note);
        assert!(!draft.is_dirty());

        draft.set_text("changed\n");
        assert!(draft.is_dirty());

        draft.set_text("body\n");
        assert!(!draft.is_dirty());
    }

    #[test]
    fn new_note_draft_is_dirty_once_non_empty() {
        let mut draft = EditableNote::for_new_note("ideas");
        assert!(draft.is_new());
        assert!(draft.note().is_none());
        assert_eq!(draft.category(), "ideas");
        assert!(!draft.is_dirty());

        draft.set_text("# Idea");
        assert!(draft.is_dirty());
    }
}
