use notecase_core::{
    CategoryIndex, CoreConfig, MarkdownNote, NoteSearchIndex, SchemaState, SearchError,
    SearchQuery, TextEncoding, SCHEMA_VERSION,
};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

fn user_version(path: &Path) -> u32 {
    Connection::open(path)
        .unwrap()
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn new_file_is_created_empty_and_stamped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite3");

    let index = NoteSearchIndex::open(&path).unwrap();
    assert_eq!(index.schema_state(), SchemaState::Created);
    assert!(index.is_empty().unwrap());
    drop(index);

    assert_eq!(user_version(&path), SCHEMA_VERSION);
}

#[test]
fn in_memory_index_always_needs_rebuild() {
    let index = NoteSearchIndex::in_memory().unwrap();
    assert_eq!(index.schema_state(), SchemaState::Created);
    assert!(index.needs_rebuild());
}

#[test]
fn legacy_layout_is_wiped_and_recreated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE notes (title TEXT);
         INSERT INTO notes (title) VALUES ('stale');",
    )
    .unwrap();
    drop(conn);

    let index = NoteSearchIndex::open(&path).unwrap();
    assert_eq!(index.schema_state(), SchemaState::Reset { from: 0 });
    assert!(index.needs_rebuild());
    assert_eq!(index.len().unwrap(), 0);

    let note = MarkdownNote::from_text("c", 0, "/c/a.md", "# A\n\nheron\n");
    index.upsert_note(&note).unwrap();
    let hits = index.search(&SearchQuery::new("heron")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title.as_deref(), Some("A"));
}

#[test]
fn newer_schema_is_refused_and_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE keep (x); PRAGMA user_version = 999;")
        .unwrap();
    drop(conn);

    match NoteSearchIndex::open(&path) {
        Err(SearchError::SchemaTooNew { found, supported }) => {
            assert_eq!(found, 999);
            assert_eq!(supported, SCHEMA_VERSION);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema should be refused"),
    }
    assert_eq!(user_version(&path), 999);
}

#[test]
fn edited_note_drops_its_old_terms() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("notes");
    fs::create_dir_all(root.join("c")).unwrap();
    fs::write(root.join("c").join("a.md"), "# A\n\nwalrus\n").unwrap();
    let inventory = CategoryIndex::scan(&CoreConfig::new(&root)).unwrap();

    let mut index = NoteSearchIndex::in_memory().unwrap();
    index.rebuild(&inventory, TextEncoding::Utf8).unwrap();
    assert_eq!(index.search(&SearchQuery::new("walrus")).unwrap().len(), 1);

    let edited = MarkdownNote::from_text("c", 0, root.join("c").join("a.md"), "# A\n\notter\n");
    index.upsert_note(&edited).unwrap();
    assert!(index.search(&SearchQuery::new("walrus")).unwrap().is_empty());
    assert_eq!(index.search(&SearchQuery::new("otter")).unwrap().len(), 1);
    assert_eq!(index.len().unwrap(), 1);
}
