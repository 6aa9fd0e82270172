use notecase_core::{ConfigError, CoreConfig, FileSystemBackend, NoteBackend, TextEncoding};
use std::fs;
use std::sync::Arc;

#[test]
fn load_reads_json_file_and_drives_backend() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("notes");
    fs::create_dir_all(root.join("plain")).unwrap();
    fs::write(root.join("plain").join("a.txt"), "text note").unwrap();
    fs::write(root.join("plain").join("b.md"), "ignored extension").unwrap();

    let config_path = dir.path().join("notecase.json");
    let json = serde_json::json!({
        "storage_root": root,
        "encoding": "latin1",
        "note_extensions": ["TXT"],
    });
    fs::write(&config_path, json.to_string()).unwrap();

    let config = CoreConfig::load(&config_path).unwrap();
    assert_eq!(config.encoding, TextEncoding::Latin1);
    assert_eq!(config.primary_note_extension(), "txt");

    let backend = FileSystemBackend::open(Arc::new(config)).unwrap();
    let handles = backend.list_notes("plain").unwrap();
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].file_name, "a.txt");
}

#[test]
fn load_reports_missing_file_and_bad_json() {
    let dir = tempfile::tempdir().unwrap();

    let missing = CoreConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));

    let bad_path = dir.path().join("bad.json");
    fs::write(&bad_path, "{ not json").unwrap();
    assert!(matches!(
        CoreConfig::load(&bad_path).unwrap_err(),
        ConfigError::Json(_)
    ));

    let empty_root = CoreConfig::from_json_str(r#"{"storage_root": ""}"#).unwrap_err();
    assert!(matches!(empty_root, ConfigError::Invalid(_)));

    let no_extensions =
        CoreConfig::from_json_str(r#"{"storage_root": "/n", "note_extensions": [" . "]}"#)
            .unwrap_err();
    assert!(matches!(no_extensions, ConfigError::Invalid(_)));
}

#[test]
fn config_serializes_back_to_json() {
    let config = CoreConfig::new("/srv/notes");
    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["encoding"], "utf8");
    assert_eq!(value["note_extensions"][0], "md");

    let parsed: CoreConfig = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, config);
}
