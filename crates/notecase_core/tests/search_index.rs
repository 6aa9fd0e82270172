use notecase_core::{
    CategoryIndex, CoreConfig, MarkdownNote, NoteSearchIndex, SearchError, SearchQuery,
    TextEncoding,
};
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn seeded_index(root: &Path) -> NoteSearchIndex {
    write(root, "recipes/1-pancakes.md", "# Pancakes\n\nflour milk eggs\n");
    write(root, "recipes/2-omelette.md", "# Omelette\n\neggs butter salt\n");
    write(root, "shopping/list.md", "# Weekly\n\nmilk bread apples\n");
    let inventory = CategoryIndex::scan(&CoreConfig::new(root)).unwrap();

    let mut index = NoteSearchIndex::in_memory().unwrap();
    let stats = index.rebuild(&inventory, TextEncoding::Utf8).unwrap();
    assert_eq!(stats.indexed, 3);
    assert_eq!(stats.skipped, 0);
    index
}

#[test]
fn search_finds_notes_across_categories() {
    let dir = tempfile::tempdir().unwrap();
    let index = seeded_index(dir.path());

    let mut hits = index
        .search(&SearchQuery::new("milk"))
        .unwrap()
        .into_iter()
        .map(|hit| (hit.category, hit.index))
        .collect::<Vec<_>>();
    hits.sort();
    assert_eq!(
        hits,
        vec![("recipes".to_string(), 0), ("shopping".to_string(), 0)]
    );
}

#[test]
fn terms_are_combined_with_and() {
    let dir = tempfile::tempdir().unwrap();
    let index = seeded_index(dir.path());

    let hits = index.search(&SearchQuery::new("eggs butter")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title.as_deref(), Some("Omelette"));
    assert!(hits[0].snippet.contains("[butter]"));
}

#[test]
fn category_filter_and_limit_apply() {
    let dir = tempfile::tempdir().unwrap();
    let index = seeded_index(dir.path());

    let hits = index
        .search(&SearchQuery::new("milk").in_category("shopping"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].category, "shopping");

    let limited = index.search(&SearchQuery::new("eggs").with_limit(1)).unwrap();
    assert_eq!(limited.len(), 1);
    assert!(index
        .search(&SearchQuery::new("eggs").with_limit(0))
        .unwrap()
        .is_empty());
}

#[test]
fn blank_query_and_punctuation_are_safe() {
    let dir = tempfile::tempdir().unwrap();
    let index = seeded_index(dir.path());

    assert!(index.search(&SearchQuery::new("   ")).unwrap().is_empty());
    assert!(index.search(&SearchQuery::new("\"unbalanced")).unwrap().is_empty());
}

#[test]
fn raw_syntax_errors_map_to_invalid_query() {
    let dir = tempfile::tempdir().unwrap();
    let index = seeded_index(dir.path());

    let mut query = SearchQuery::new("\"unterminated");
    query.raw_fts_syntax = true;
    assert!(matches!(
        index.search(&query),
        Err(SearchError::InvalidQuery { .. })
    ));
}

#[test]
fn upsert_refreshes_committed_note() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let index = seeded_index(root);

    let path = root.join("shopping").join("list.md");
    let edited = MarkdownNote::from_text("shopping", 0, path, "# Weekly\n\ncheese crackers\n");
    index.upsert_note(&edited).unwrap();

    assert_eq!(index.len().unwrap(), 3);
    assert!(index
        .search(&SearchQuery::new("bread"))
        .unwrap()
        .is_empty());
    assert_eq!(index.search(&SearchQuery::new("cheese")).unwrap().len(), 1);
}

#[test]
fn undecodable_notes_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "mixed/good.md", "# Good\n\nreadable\n");
    fs::write(root.join("mixed").join("bad.md"), [0xff, 0xfe]).unwrap();
    let inventory = CategoryIndex::scan(&CoreConfig::new(root)).unwrap();

    let mut index = NoteSearchIndex::in_memory().unwrap();
    let stats = index.rebuild(&inventory, TextEncoding::Utf8).unwrap();
    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.skipped, 1);
}

#[test]
fn rebuild_replaces_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut index = seeded_index(root);

    fs::remove_dir_all(root.join("recipes")).unwrap();
    let inventory = CategoryIndex::scan(&CoreConfig::new(root)).unwrap();
    index.rebuild(&inventory, TextEncoding::Utf8).unwrap();

    assert_eq!(index.len().unwrap(), 1);
    assert!(index.search(&SearchQuery::new("pancakes")).unwrap().is_empty());
}

#[test]
fn file_backed_index_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("notes");
    write(&root, "a/x.md", "# X\n\nzebra\n");
    let db_path = dir.path().join("index.sqlite3");
    let inventory = CategoryIndex::scan(&CoreConfig::new(&root)).unwrap();

    let mut index = NoteSearchIndex::open(&db_path).unwrap();
    assert!(index.needs_rebuild());
    index.rebuild(&inventory, TextEncoding::Utf8).unwrap();
    assert!(!index.needs_rebuild());
    drop(index);

    let reopened = NoteSearchIndex::open(&db_path).unwrap();
    assert!(!reopened.needs_rebuild());
    assert_eq!(reopened.search(&SearchQuery::new("zebra")).unwrap().len(), 1);
}
