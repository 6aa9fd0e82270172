use notecase_core::{
    BackgroundLoader, CoreConfig, FileSystemBackend, Job, JobOutput, NoteBackend,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

fn loader(root: &Path) -> BackgroundLoader<FileSystemBackend> {
    fs::create_dir_all(root.join("test")).unwrap();
    fs::write(root.join("test").join("a.md"), "# Alpha\n").unwrap();
    fs::write(root.join("test").join("b.md"), "# Beta\n").unwrap();
    let backend = FileSystemBackend::open(Arc::new(CoreConfig::new(root))).unwrap();
    BackgroundLoader::new(Arc::new(backend))
}

#[test]
fn load_runs_off_thread_and_completes() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = loader(dir.path());

    let id = loader.request_load("test", 1);
    assert_eq!(loader.pending(), 1);

    let completion = loader.wait(WAIT).expect("load should complete");
    assert_eq!(completion.id, id);
    assert_eq!(completion.job, "load_note");
    match completion.result.unwrap() {
        JobOutput::Note(note) => assert_eq!(note.title(), Some("Beta")),
        other => panic!("unexpected output: {other:?}"),
    }
    assert_eq!(loader.pending(), 0);
}

#[test]
fn failures_are_delivered_as_values() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = loader(dir.path());

    loader.request_load("missing", 0);
    let completion = loader.wait(WAIT).expect("job should complete");
    assert!(completion.result.unwrap_err().is_not_found());
}

#[test]
fn cancelled_result_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = loader(dir.path());

    let cancelled = loader.request_load("test", 0);
    assert!(loader.cancel(cancelled));
    let kept = loader.request_notes("test");

    let completion = loader.wait(WAIT).expect("list should complete");
    assert_eq!(completion.id, kept);
    match completion.result.unwrap() {
        JobOutput::Notes(handles) => assert_eq!(handles.len(), 2),
        other => panic!("unexpected output: {other:?}"),
    }

    let deadline = Instant::now() + WAIT;
    while loader.pending() > 0 && Instant::now() < deadline {
        assert!(loader.poll().is_empty());
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(loader.pending(), 0);
    assert!(!loader.cancel(cancelled));
}

#[test]
fn save_rescan_and_create_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = loader(dir.path());

    loader.request_save("test", 0, "# Alpha 2\n");
    assert!(matches!(
        loader.wait(WAIT).unwrap().result.unwrap(),
        JobOutput::Saved
    ));
    assert_eq!(
        fs::read_to_string(dir.path().join("test").join("a.md")).unwrap(),
        "# Alpha 2\n"
    );

    loader.submit(Job::CreateNote {
        category: "test".to_string(),
        text: "# Gamma\n".to_string(),
    });
    match loader.wait(WAIT).unwrap().result.unwrap() {
        JobOutput::Created(note) => assert_eq!(note.title(), Some("Gamma")),
        other => panic!("unexpected output: {other:?}"),
    }

    fs::create_dir_all(dir.path().join("later")).unwrap();
    fs::write(dir.path().join("later").join("x.md"), "x").unwrap();
    loader.request_rescan();
    assert!(matches!(
        loader.wait(WAIT).unwrap().result.unwrap(),
        JobOutput::Rescanned { categories: 2 }
    ));
    assert!(loader.backend().categories().contains("later"));
}

#[test]
fn poll_collects_all_ready_completions() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = loader(dir.path());

    let ids = [
        loader.request_load("test", 0),
        loader.request_load("test", 1),
        loader.request_notes("test"),
    ];

    let mut seen = Vec::new();
    let deadline = Instant::now() + WAIT;
    while seen.len() < ids.len() && Instant::now() < deadline {
        seen.extend(loader.poll().into_iter().map(|completion| completion.id));
        std::thread::sleep(Duration::from_millis(5));
    }
    seen.sort();
    assert_eq!(seen, ids.to_vec());
}

#[test]
fn many_requests_share_a_fixed_pool() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("test")).unwrap();
    fs::write(dir.path().join("test").join("a.md"), "# Alpha\n").unwrap();
    let backend = FileSystemBackend::open(Arc::new(CoreConfig::new(dir.path()))).unwrap();
    let mut loader = BackgroundLoader::with_workers(Arc::new(backend), 2);
    assert_eq!(loader.worker_count(), 2);

    let ids = (0..64)
        .map(|_| loader.request_load("test", 0))
        .collect::<Vec<_>>();
    assert_eq!(loader.worker_count(), 2);

    let mut seen = Vec::new();
    while seen.len() < ids.len() {
        let completion = loader.wait(WAIT).expect("queued load should complete");
        assert!(completion.result.is_ok());
        seen.push(completion.id);
    }
    seen.sort();
    assert_eq!(seen, ids);
    assert_eq!(loader.pending(), 0);
}

#[test]
fn single_worker_completes_in_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("test")).unwrap();
    fs::write(dir.path().join("test").join("a.md"), "# Alpha\n").unwrap();
    let backend = FileSystemBackend::open(Arc::new(CoreConfig::new(dir.path()))).unwrap();
    let mut loader = BackgroundLoader::with_workers(Arc::new(backend), 0);
    assert_eq!(loader.worker_count(), 1);

    let save = loader.request_save("test", 0, "# Alpha 2\n");
    let load = loader.request_load("test", 0);

    assert_eq!(loader.wait(WAIT).unwrap().id, save);
    let completion = loader.wait(WAIT).unwrap();
    assert_eq!(completion.id, load);
    match completion.result.unwrap() {
        JobOutput::Note(note) => assert_eq!(note.title(), Some("Alpha 2")),
        other => panic!("unexpected output: {other:?}"),
    }
}
