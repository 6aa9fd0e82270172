//! SQLite FTS5 cross-note search index.
//!
//! # Responsibility
//! - Mirror every note of an inventory snapshot into an FTS5 table.
//! - Answer keyword queries with `(category, index)` hits and snippets.
//!
//! # Invariants
//! - `rebuild` replaces all rows in one transaction.
//! - Result ordering is deterministic: bm25 rank, then category, then index.
//! - Notes that fail to load are skipped and counted, never fatal.

use crate::config::TextEncoding;
use super::schema::{self, SchemaState};
use crate::model::note::MarkdownNote;
use crate::repo::category_index::CategoryIndex;
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and row decoding.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Sqlite(rusqlite::Error),
    /// Index file was written by a newer layout than this build knows.
    SchemaTooNew {
        found: u32,
        supported: u32,
    },
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "search index schema version {found} is newer than supported {supported}"
            ),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Search options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// Restrict hits to one category.
    pub category: Option<String>,
    pub limit: u32,
    /// Pass `text` through as a raw FTS5 expression.
    ///
    /// Off by default so type-as-you-search input never hits syntax errors.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: None,
            limit: DEFAULT_SEARCH_LIMIT,
            raw_fts_syntax: false,
        }
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub category: String,
    pub index: usize,
    pub title: Option<String>,
    pub snippet: String,
}

/// Counters from one `rebuild`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub indexed: usize,
    pub skipped: usize,
}

/// Full-text index over all notes, in memory or in a file.
pub struct NoteSearchIndex {
    conn: Connection,
    schema: SchemaState,
}

impl NoteSearchIndex {
    /// Creates an empty in-memory index.
    pub fn in_memory() -> SearchResult<Self> {
        let (conn, schema) = schema::open_memory()?;
        Ok(Self { conn, schema })
    }

    /// Opens (or creates) a file-backed index.
    ///
    /// A current file keeps the rows of its last rebuild so a large storage
    /// root can be searched before rebuilding. Check `needs_rebuild`.
    ///
    /// # Errors
    /// - `SchemaTooNew` when the file comes from a newer build.
    /// - `Sqlite` when the file cannot be opened or prepared.
    pub fn open(path: impl AsRef<Path>) -> SearchResult<Self> {
        let (conn, schema) = schema::open_file(path.as_ref())?;
        Ok(Self { conn, schema })
    }

    /// Schema outcome of opening this index.
    pub fn schema_state(&self) -> SchemaState {
        self.schema
    }

    /// `true` until the first `rebuild` when no usable rows were found.
    pub fn needs_rebuild(&self) -> bool {
        self.schema.needs_rebuild()
    }

    /// Replaces the index contents with every note of `inventory`.
    pub fn rebuild(
        &mut self,
        inventory: &CategoryIndex,
        encoding: TextEncoding,
    ) -> SearchResult<IndexStats> {
        let started_at = Instant::now();
        let mut stats = IndexStats::default();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM notes;", [])?;

        for category in inventory.categories() {
            for (index, path) in category.notes.iter().enumerate() {
                match MarkdownNote::load(category.name.as_str(), index, path.as_path(), encoding) {
                    Ok(note) => {
                        insert_note(&tx, &note)?;
                        stats.indexed += 1;
                    }
                    Err(err) => {
                        warn!(
                            "event=search_index_build module=search status=degraded category={} index={} error_code={}",
                            category.name,
                            index,
                            err.error_code()
                        );
                        stats.skipped += 1;
                    }
                }
            }
        }
        tx.commit()?;
        self.schema = SchemaState::Current;

        info!(
            "event=search_index_build module=search status=ok indexed={} skipped={} duration_ms={}",
            stats.indexed,
            stats.skipped,
            started_at.elapsed().as_millis()
        );
        Ok(stats)
    }

    /// Inserts or refreshes one note, e.g. after a commit.
    pub fn upsert_note(&self, note: &MarkdownNote) -> SearchResult<()> {
        insert_note(&self.conn, note)
    }

    /// Number of indexed notes.
    pub fn len(&self) -> SearchResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| SearchError::InvalidData(format!("count {count}")))
    }

    pub fn is_empty(&self) -> SearchResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Runs a ranked keyword search. Blank queries return no hits.
    pub fn search(&self, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
        let Some(match_expr) = build_match_expression(query) else {
            return Ok(Vec::new());
        };
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            "SELECT
                notes.category AS category,
                notes.note_index AS note_index,
                notes.title AS title,
                snippet(notes_fts, 1, '[', ']', ' ... ', 10) AS snippet
             FROM notes_fts
             JOIN notes ON notes.note_id = notes_fts.rowid
             WHERE notes_fts MATCH ?",
        );
        let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

        if let Some(category) = query.category.as_ref() {
            sql.push_str(" AND notes.category = ?");
            bind_values.push(Value::Text(category.clone()));
        }

        sql.push_str(" ORDER BY bm25(notes_fts), notes.category ASC, notes.note_index ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(query.limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt
            .query(params_from_iter(bind_values))
            .map_err(|err| map_query_error(err, &match_expr))?;
        let mut hits = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|err| map_query_error(err, &match_expr))?
        {
            hits.push(parse_search_hit(row)?);
        }

        Ok(hits)
    }
}

fn insert_note(conn: &Connection, note: &MarkdownNote) -> SearchResult<()> {
    let index = i64::try_from(note.index())
        .map_err(|_| SearchError::InvalidData(format!("note index {}", note.index())))?;
    conn.execute(
        "INSERT INTO notes (category, note_index, path, title, content)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (category, note_index) DO UPDATE SET
            path = excluded.path,
            title = excluded.title,
            content = excluded.content;",
        params![
            note.category(),
            index,
            note.path().to_string_lossy().into_owned(),
            note.title(),
            note.raw_text(),
        ],
    )?;
    Ok(())
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let index: i64 = row.get("note_index")?;
    let index = usize::try_from(index)
        .map_err(|_| SearchError::InvalidData(format!("invalid note_index `{index}`")))?;
    Ok(SearchHit {
        category: row.get("category")?,
        index,
        title: row.get("title")?,
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }
    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }
    SearchError::Sqlite(err)
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
                || msg.contains("no such column")
        }
        _ => false,
    }
}
