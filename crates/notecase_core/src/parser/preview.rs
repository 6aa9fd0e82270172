//! Title preview derivation for note list entries.
//!
//! Rules:
//! - first heading text when the note has one;
//! - otherwise the first non-blank line with markdown symbols stripped and
//!   whitespace collapsed;
//! - capped at `TITLE_PREVIEW_MAX_CHARS` characters.

use crate::model::block::BlockKind;
use crate::parser::markdown::parse;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum preview length in characters.
pub const TITLE_PREVIEW_MAX_CHARS: usize = 100;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)]\([^)]+\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\*_`#>~|]+").expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Derives a one-line preview from raw note text.
///
/// Returns `None` when the text has no visible content, so callers can fall
/// back to the file name.
pub fn derive_title_preview(raw_text: &str) -> Option<String> {
    let blocks = parse(raw_text);
    let heading = blocks.iter().find_map(|block| match &block.kind {
        BlockKind::Heading { text, .. } if !text.is_empty() => Some(text.as_str()),
        _ => None,
    });
    let candidate = match heading {
        Some(text) => strip_markdown(text),
        None => raw_text
            .lines()
            .map(strip_markdown)
            .find(|line| !line.is_empty())?,
    };
    if candidate.is_empty() {
        return None;
    }
    Some(candidate.chars().take(TITLE_PREVIEW_MAX_CHARS).collect())
}

fn strip_markdown(line: &str) -> String {
    let line = line.trim_start_matches('\u{feff}');
    let without_images = MARKDOWN_IMAGE_RE.replace_all(line, "$1");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    WHITESPACE_RE
        .replace_all(&without_symbols, " ")
        .trim()
        .to_string()
}
