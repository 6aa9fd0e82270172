//! Lenient block-level markdown parser.
//!
//! # Responsibility
//! - Split raw note text into blank-line separated candidates.
//! - Classify each candidate as heading, block quote, table or paragraph.
//! - Report candidates that fell back to paragraph as `Degradation`s.
//!
//! # Invariants
//! - Parsing is total and pure: any input yields a block list, never an error.
//! - Every non-blank source line is covered by exactly one block span.
//! - Paragraph text is the candidate source slice, byte for byte.

use crate::model::block::{Block, BlockKind, SourceSpan};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*)$").expect("valid heading regex"));
static TABLE_DELIMITER_CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:?-+:?$").expect("valid delimiter regex"));

const BYTE_ORDER_MARK: char = '\u{feff}';
const MAX_HEADING_LEVEL: usize = 6;

/// Why a candidate was kept as a paragraph instead of a stricter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// `#` run directly followed by text, e.g. `#tag`.
    HeadingMissingSpace,
    /// More than six `#` before the heading text.
    HeadingTooDeep { hashes: usize },
    /// First line looked like a table but a later row has no pipe.
    TableRowWithoutPipe { row: usize },
    /// A lone pipe line is too weak a signal for a table.
    TableSingleRow,
    /// Row `row` has `found` cells while the header has `expected`.
    TableColumnMismatch {
        expected: usize,
        found: usize,
        row: usize,
    },
}

impl Display for DegradeReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeadingMissingSpace => write!(f, "heading_missing_space"),
            Self::HeadingTooDeep { hashes } => write!(f, "heading_too_deep hashes={hashes}"),
            Self::TableRowWithoutPipe { row } => write!(f, "table_row_without_pipe row={row}"),
            Self::TableSingleRow => write!(f, "table_single_row"),
            Self::TableColumnMismatch {
                expected,
                found,
                row,
            } => write!(
                f,
                "table_column_mismatch expected={expected} found={found} row={row}"
            ),
        }
    }
}

/// Informational diagnostic for one degraded candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Degradation {
    pub span: SourceSpan,
    pub reason: DegradeReason,
}

/// Parse output with fallback diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub blocks: Vec<Block>,
    pub degraded: Vec<Degradation>,
}

/// Parses raw note text into ordered blocks.
///
/// Equivalent to `parse_report(text).blocks`.
pub fn parse(text: &str) -> Vec<Block> {
    parse_report(text).blocks
}

/// Parses raw note text and keeps the paragraph fallback diagnostics.
pub fn parse_report(text: &str) -> ParseReport {
    let body_start = if text.starts_with(BYTE_ORDER_MARK) {
        BYTE_ORDER_MARK.len_utf8()
    } else {
        0
    };
    let lines = split_lines(&text[body_start..], body_start);

    let mut report = ParseReport::default();
    for candidate in candidates(&lines) {
        classify(text, candidate, &mut report);
    }

    for degradation in &report.degraded {
        debug!(
            "event=parse_degraded module=parser status=degraded reason={} span={}..{}",
            degradation.reason, degradation.span.start, degradation.span.end
        );
    }

    report
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    start: usize,
    /// Excludes the `\n` / `\r\n` terminator.
    end: usize,
    text: &'a str,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

fn split_lines(text: &str, base: usize) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = base;
    for chunk in text.split_inclusive('\n') {
        let content = chunk.strip_suffix('\n').unwrap_or(chunk);
        let content = content.strip_suffix('\r').unwrap_or(content);
        lines.push(Line {
            start: offset,
            end: offset + content.len(),
            text: content,
        });
        offset += chunk.len();
    }
    lines
}

fn candidates<'l, 'a>(lines: &'l [Line<'a>]) -> Vec<&'l [Line<'a>]> {
    let mut groups = Vec::new();
    let mut group_start: Option<usize> = None;
    for (idx, line) in lines.iter().enumerate() {
        match (line.is_blank(), group_start) {
            (false, None) => group_start = Some(idx),
            (true, Some(start)) => {
                groups.push(&lines[start..idx]);
                group_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = group_start {
        groups.push(&lines[start..]);
    }
    groups
}

fn classify(source: &str, candidate: &[Line<'_>], report: &mut ParseReport) {
    let mut rest = candidate;

    // A heading owns exactly one line; the remainder is classified again.
    while let Some(first) = rest.first() {
        if let Some((level, text)) = match_heading(first.text) {
            report.blocks.push(Block::new(
                BlockKind::Heading { level, text },
                SourceSpan::new(first.start, first.end),
            ));
            rest = &rest[1..];
            continue;
        }
        classify_body(source, rest, report);
        return;
    }
}

fn classify_body(source: &str, lines: &[Line<'_>], report: &mut ParseReport) {
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return;
    };
    let span = SourceSpan::new(first.start, last.end);

    if let Some(reason) = heading_degradation(first.text) {
        report.degraded.push(Degradation { span, reason });
    }

    if lines
        .iter()
        .all(|line| line.text.trim_start().starts_with('>'))
    {
        let text = lines
            .iter()
            .map(|line| strip_quote_marker(line.text))
            .collect::<Vec<_>>()
            .join("\n");
        report
            .blocks
            .push(Block::new(BlockKind::BlockQuote { text }, span));
        return;
    }

    match table_rows(lines) {
        Ok(Some(rows)) => {
            report.blocks.push(Block::new(BlockKind::Table { rows }, span));
            return;
        }
        Ok(None) => {}
        Err(reason) => report.degraded.push(Degradation { span, reason }),
    }

    let text = span.slice(source).unwrap_or_default().to_string();
    report
        .blocks
        .push(Block::new(BlockKind::Paragraph { text }, span));
}

fn match_heading(line: &str) -> Option<(u8, String)> {
    let caps = HEADING_RE.captures(line)?;
    let level = u8::try_from(caps.get(1)?.as_str().len()).ok()?;
    let text = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
    Some((level, text))
}

fn heading_degradation(line: &str) -> Option<DegradeReason> {
    let hashes = line.chars().take_while(|ch| *ch == '#').count();
    if hashes == 0 {
        return None;
    }
    let next = line[hashes..].chars().next();
    match next {
        Some(' ') | Some('\t') if hashes > MAX_HEADING_LEVEL => {
            Some(DegradeReason::HeadingTooDeep { hashes })
        }
        Some(ch) if !ch.is_whitespace() && hashes <= MAX_HEADING_LEVEL => {
            Some(DegradeReason::HeadingMissingSpace)
        }
        _ => None,
    }
}

fn strip_quote_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    let without_marker = trimmed.strip_prefix('>').unwrap_or(trimmed);
    without_marker.strip_prefix(' ').unwrap_or(without_marker)
}

fn table_rows(lines: &[Line<'_>]) -> Result<Option<Vec<Vec<String>>>, DegradeReason> {
    let Some(header) = lines.first().and_then(|line| split_cells(line.text)) else {
        return Ok(None);
    };
    if lines.len() < 2 {
        return Err(DegradeReason::TableSingleRow);
    }

    let expected = header.len();
    let mut rows = vec![header];
    for (row, line) in lines.iter().enumerate().skip(1) {
        let cells = split_cells(line.text).ok_or(DegradeReason::TableRowWithoutPipe { row })?;
        if cells.len() != expected {
            return Err(DegradeReason::TableColumnMismatch {
                expected,
                found: cells.len(),
                row,
            });
        }
        if row == 1 && is_delimiter_row(&cells) {
            continue;
        }
        rows.push(cells);
    }

    Ok(Some(rows))
}

/// Splits one line on unescaped pipes; `None` when the line has no pipe.
fn split_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut saw_pipe = false;
    let mut ends_with_pipe = false;
    let mut chars = trimmed.chars().peekable();

    while let Some(ch) = chars.next() {
        ends_with_pipe = false;
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                chars.next();
                current.push('|');
            }
            '|' => {
                saw_pipe = true;
                ends_with_pipe = true;
                cells.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    cells.push(current);

    if !saw_pipe {
        return None;
    }
    if trimmed.starts_with('|') {
        cells.remove(0);
    }
    if ends_with_pipe {
        cells.pop();
    }
    if cells.is_empty() {
        return None;
    }

    Some(cells.iter().map(|cell| cell.trim().to_string()).collect())
}

fn is_delimiter_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|cell| TABLE_DELIMITER_CELL_RE.is_match(cell.as_str()))
}

#[cfg(test)]
mod tests {
    use super::{heading_degradation, split_cells, DegradeReason};

    #[test]
    fn split_cells_strips_outer_pipes_and_trims() {
        assert_eq!(
            split_cells("| a | b |"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            split_cells("a|b"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(split_cells("no pipes here"), None);
        assert_eq!(split_cells("|"), None);
    }

    #[test]
    fn split_cells_keeps_escaped_pipes_inside_cell() {
        assert_eq!(
            split_cells(r"| a \| b | c |"),
            Some(vec!["a | b".to_string(), "c".to_string()])
        );
        assert_eq!(split_cells(r"just \| escaped"), None);
    }

    #[test]
    fn heading_degradation_flags_near_misses_only() {
        assert_eq!(
            heading_degradation("#tag"),
            Some(DegradeReason::HeadingMissingSpace)
        );
        assert_eq!(
            heading_degradation("####### deep"),
            Some(DegradeReason::HeadingTooDeep { hashes: 7 })
        );
        assert_eq!(heading_degradation("plain"), None);
        assert_eq!(heading_degradation("#"), None);
    }
}
