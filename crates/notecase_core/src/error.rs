//! Storage and model error taxonomy.
//!
//! # Responsibility
//! - Give load/scan/save failures explicit, typed values.
//! - Provide stable error codes for metadata-only log events.
//!
//! # Invariants
//! - Parsing never produces a `NoteError`; fallback parsing is reported
//!   through `parser::Degradation` instead.
//! - `Display` output is human-readable and safe to show in the ERROR view.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Result type for storage and note operations.
pub type NoteResult<T> = Result<T, NoteError>;

/// What could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundTarget {
    StorageRoot(PathBuf),
    Category(String),
    Note { category: String, index: usize },
    NoteFile(PathBuf),
}

impl Display for NotFoundTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageRoot(path) => write!(f, "storage root `{}`", path.display()),
            Self::Category(name) => write!(f, "category `{name}`"),
            Self::Note { category, index } => write!(f, "note #{index} in category `{category}`"),
            Self::NoteFile(path) => write!(f, "note file `{}`", path.display()),
        }
    }
}

/// Error for category scanning, note loading and note persistence.
#[derive(Debug)]
pub enum NoteError {
    /// Category or note vanished between scan and use.
    NotFound(NotFoundTarget),
    /// File bytes are not valid text in the configured encoding, or text
    /// cannot be represented in it on save.
    Decode {
        path: PathBuf,
        encoding: &'static str,
        message: String,
    },
    /// Permission, disk or write failure.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Category name is empty or would escape the storage root.
    InvalidName(String),
    /// An ADD draft was committed without any content.
    EmptyDraft,
}

impl NoteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Maps `io::ErrorKind::NotFound` onto `NotFound(NoteFile)`.
    pub(crate) fn from_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(NotFoundTarget::NoteFile(path))
        } else {
            Self::io(path, source)
        }
    }

    /// Stable snake_case code used in log events.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Decode { .. } => "decode_failed",
            Self::Io { .. } => "io_failed",
            Self::InvalidName(_) => "invalid_name",
            Self::EmptyDraft => "empty_draft",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for NoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(target) => write!(f, "{target} not found"),
            Self::Decode {
                path,
                encoding,
                message,
            } => write!(
                f,
                "cannot decode `{}` as {encoding}: {message}",
                path.display()
            ),
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::InvalidName(name) => write!(f, "invalid category name: `{name}`"),
            Self::EmptyDraft => write!(f, "new note has no content"),
        }
    }
}

impl Error for NoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::NotFound(_) => None,
            Self::Decode { .. } => None,
            Self::InvalidName(_) => None,
            Self::EmptyDraft => None,
        }
    }
}
