//! Parsed markdown block model.
//!
//! # Responsibility
//! - Define the closed set of block variants rendered by the UI.
//! - Tie each block back to the exact source bytes it was derived from.
//!
//! # Invariants
//! - `SourceSpan` is a byte range on char boundaries of the raw text the
//!   block was parsed from.
//! - Spans of blocks from one parse are non-overlapping and strictly
//!   increasing.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Byte range of a block inside the note raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Returns the slice of `source` covered by this span.
    ///
    /// Returns `None` when the span does not fit `source`, which happens when
    /// a span is applied to text other than the text it was parsed from.
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.range())
    }
}

/// Typed content of one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// ATX heading, `level` in `1..=6`.
    Heading { level: u8, text: String },
    /// Anything that did not match a stricter grammar, kept verbatim.
    Paragraph { text: String },
    /// `>`-prefixed lines with the quote marker stripped.
    BlockQuote { text: String },
    /// Pipe table; `rows[0]` is the header row.
    Table { rows: Vec<Vec<String>> },
}

/// One parsed unit of note content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub span: SourceSpan,
}

impl Block {
    pub fn new(kind: BlockKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }

    /// Short stable name of the variant, used in logs and CLI output.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            BlockKind::Heading { .. } => "heading",
            BlockKind::Paragraph { .. } => "paragraph",
            BlockKind::BlockQuote { .. } => "block_quote",
            BlockKind::Table { .. } => "table",
        }
    }

    /// Returns the heading level when this block is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            BlockKind::Heading { level, .. } => Some(level),
            _ => None,
        }
    }

    /// Returns the textual payload for text-like variants.
    ///
    /// Tables have no single text payload and return `None`.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Heading { text, .. }
            | BlockKind::Paragraph { text }
            | BlockKind::BlockQuote { text } => Some(text.as_str()),
            BlockKind::Table { .. } => None,
        }
    }
}
