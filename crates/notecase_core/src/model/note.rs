//! Markdown note entity.
//!
//! # Responsibility
//! - Bind a category, an ordinal index and a file path to raw note text.
//! - Cache the parsed block list derived from that text.
//!
//! # Invariants
//! - `blocks == parser::parse(raw_text)` at all times; fields are private so
//!   the cache cannot drift from the text.
//! - Raw text is kept exactly as decoded, including BOM and line endings.

use crate::config::TextEncoding;
use crate::error::{NoteError, NoteResult};
use crate::model::block::{Block, BlockKind};
use crate::parser;
use std::path::{Path, PathBuf};

/// One loaded note and its parsed blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownNote {
    category: String,
    index: usize,
    path: PathBuf,
    raw_text: String,
    blocks: Vec<Block>,
}

impl MarkdownNote {
    /// Builds a note from already decoded text and parses it.
    pub fn from_text(
        category: impl Into<String>,
        index: usize,
        path: impl Into<PathBuf>,
        raw_text: impl Into<String>,
    ) -> Self {
        let raw_text = raw_text.into();
        let blocks = parser::parse(&raw_text);
        Self {
            category: category.into(),
            index,
            path: path.into(),
            raw_text,
            blocks,
        }
    }

    /// Reads `path`, decodes it with `encoding` and parses the result.
    ///
    /// # Errors
    /// - `NotFound` when the file vanished.
    /// - `Decode` when the bytes are invalid in `encoding`.
    /// - `Io` for any other read failure.
    pub fn load(
        category: impl Into<String>,
        index: usize,
        path: impl Into<PathBuf>,
        encoding: TextEncoding,
    ) -> NoteResult<Self> {
        let path = path.into();
        let bytes = std::fs::read(&path).map_err(|err| NoteError::from_read(&path, err))?;
        let raw_text = encoding.decode(&path, bytes)?;
        Ok(Self::from_text(category, index, path, raw_text))
    }

    /// Replaces the raw text and re-parses. Used after a successful commit.
    pub fn with_raw_text(self, raw_text: impl Into<String>) -> Self {
        Self::from_text(self.category, self.index, self.path, raw_text)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Text of the first heading, if any.
    pub fn title(&self) -> Option<&str> {
        self.blocks.iter().find_map(|block| match &block.kind {
            BlockKind::Heading { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Exact source text of block `index`.
    pub fn block_source(&self, index: usize) -> Option<&str> {
        let block = self.blocks.get(index)?;
        block.span.slice(&self.raw_text)
    }
}
