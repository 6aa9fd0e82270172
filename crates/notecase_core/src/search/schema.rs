//! Schema and connection bootstrap for the search index database.
//!
//! # Responsibility
//! - Open index connections (file or memory) with the schema in place.
//! - Report whether the caller must rebuild before the index is usable.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - The index is derived data. A database left by an older layout is
//!   dropped and recreated instead of migrated; a newer one is refused so
//!   two binaries never fight over one file.

use super::fts::{SearchError, SearchResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Layout version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

const CREATE_SQL: &str = include_str!("schema.sql");

const DROP_SQL: &str = "
    DROP TRIGGER IF EXISTS notes_ai;
    DROP TRIGGER IF EXISTS notes_ad;
    DROP TRIGGER IF EXISTS notes_au;
    DROP TABLE IF EXISTS notes_fts;
    DROP TABLE IF EXISTS notes;
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// What opening an index found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Brand-new database; holds no notes yet.
    Created,
    /// Existing database at `SCHEMA_VERSION`; rows are from the last rebuild.
    Current,
    /// Database from an older layout `from`; it was wiped and recreated.
    Reset { from: u32 },
}

impl SchemaState {
    /// `true` unless the rows of a previous rebuild survived.
    pub fn needs_rebuild(self) -> bool {
        !matches!(self, Self::Current)
    }
}

pub(crate) fn open_file(path: &Path) -> SearchResult<(Connection, SchemaState)> {
    bootstrap("file", || Connection::open(path))
}

pub(crate) fn open_memory() -> SearchResult<(Connection, SchemaState)> {
    bootstrap("memory", Connection::open_in_memory)
}

fn bootstrap<F>(mode: &str, open: F) -> SearchResult<(Connection, SchemaState)>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    let result = open().map_err(SearchError::from).and_then(|mut conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let state = prepare(&mut conn)?;
        Ok((conn, state))
    });

    match &result {
        Ok((_, state)) => info!(
            "event=search_index_open module=search status=ok mode={} schema={:?} duration_ms={}",
            mode,
            state,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=search_index_open module=search status=error mode={} error={}",
            mode, err
        ),
    }
    result
}

fn prepare(conn: &mut Connection) -> SearchResult<SchemaState> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if found > SCHEMA_VERSION {
        return Err(SearchError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found == SCHEMA_VERSION {
        return Ok(SchemaState::Current);
    }

    let had_tables = has_user_tables(conn)?;
    let tx = conn.transaction()?;
    tx.execute_batch(DROP_SQL)?;
    tx.execute_batch(CREATE_SQL)?;
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    tx.commit()?;

    Ok(if found == 0 && !had_tables {
        SchemaState::Created
    } else {
        SchemaState::Reset { from: found }
    })
}

fn has_user_tables(conn: &Connection) -> SearchResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%';",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::SchemaState;

    #[test]
    fn only_current_schema_keeps_rows() {
        assert!(SchemaState::Created.needs_rebuild());
        assert!(SchemaState::Reset { from: 0 }.needs_rebuild());
        assert!(!SchemaState::Current.needs_rebuild());
    }
}
