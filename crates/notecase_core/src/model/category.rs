//! Category inventory records.
//!
//! # Invariants
//! - `notes` is non-empty for every category produced by a scan.
//! - `notes` order is the index order used by `(category, index)` lookups.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One category directory discovered under the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Directory name; unique within one storage root.
    pub name: String,
    pub dir: PathBuf,
    /// First image file found in the directory, in note sort order.
    pub image: Option<PathBuf>,
    /// Note files in stable index order.
    pub notes: Vec<PathBuf>,
}

impl Category {
    pub fn note_path(&self, index: usize) -> Option<&Path> {
        self.notes.get(index).map(PathBuf::as_path)
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Index of `path` within this category, if listed.
    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.notes.iter().position(|note| note == path)
    }
}

/// Lightweight list entry shown in the LIST view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteHandle {
    pub index: usize,
    pub file_name: String,
    pub title_preview: String,
}
