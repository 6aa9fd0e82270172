//! Filesystem scan producing the category inventory.
//!
//! # Responsibility
//! - Discover one category per qualifying subdirectory of the storage root.
//! - Order note files deterministically so indexes are stable across scans.
//!
//! # Invariants
//! - A directory is a category only if it holds at least one note file.
//! - Hidden entries (leading `.`) are ignored, which also hides in-flight
//!   temporary files from atomic saves.
//! - A scan never mutates an existing index; it builds a new one.

use crate::config::CoreConfig;
use crate::error::{NotFoundTarget, NoteError, NoteResult};
use crate::model::category::Category;
use log::{info, warn};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Immutable snapshot of all categories under one storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryIndex {
    root: PathBuf,
    categories: BTreeMap<String, Category>,
}

impl CategoryIndex {
    /// Index with no categories, used before the first scan completes.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            categories: BTreeMap::new(),
        }
    }

    /// Scans `config.storage_root` and builds a fresh index.
    ///
    /// Unreadable category directories are skipped with a warning so one bad
    /// directory does not hide the rest of the inventory.
    ///
    /// # Errors
    /// - `NotFound(StorageRoot)` when the root is missing or not a directory.
    /// - `Io` when the root itself cannot be listed.
    pub fn scan(config: &CoreConfig) -> NoteResult<Self> {
        let started_at = Instant::now();
        let root = config.storage_root.as_path();
        if !root.is_dir() {
            warn!(
                "event=scan module=repo status=error error_code=not_found root={}",
                root.display()
            );
            return Err(NoteError::NotFound(NotFoundTarget::StorageRoot(
                root.to_path_buf(),
            )));
        }

        let entries = std::fs::read_dir(root).map_err(|err| NoteError::io(root, err))?;
        let mut categories = BTreeMap::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("event=scan module=repo status=degraded error={err}");
                    continue;
                }
            };
            let path = entry.path();
            let Some(name) = visible_utf8_name(&path) else {
                continue;
            };
            if !path.is_dir() {
                continue;
            }

            match scan_category_dir(config, name, &path) {
                Ok(Some(category)) => {
                    categories.insert(category.name.clone(), category);
                }
                Ok(None) => {}
                Err(err) => warn!(
                    "event=scan module=repo status=degraded error_code={} category={} error={}",
                    err.error_code(),
                    name,
                    err
                ),
            }
        }

        info!(
            "event=scan module=repo status=ok categories={} duration_ms={}",
            categories.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Self {
            root: root.to_path_buf(),
            categories,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Category names in sorted order.
    pub fn names(&self) -> BTreeSet<String> {
        self.categories.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    /// Categories ordered by name.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total number of notes across all categories.
    pub fn note_count(&self) -> usize {
        self.categories.values().map(Category::note_count).sum()
    }
}

fn scan_category_dir(config: &CoreConfig, name: &str, dir: &Path) -> NoteResult<Option<Category>> {
    let mut notes = Vec::new();
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|err| NoteError::io(dir, err))? {
        let path = entry.map_err(|err| NoteError::io(dir, err))?.path();
        if visible_utf8_name(&path).is_none() || !path.is_file() {
            continue;
        }
        if config.is_note_file(&path) {
            notes.push(path);
        } else if config.is_image_file(&path) {
            images.push(path);
        }
    }

    if notes.is_empty() {
        return Ok(None);
    }
    sort_paths(&mut notes);
    sort_paths(&mut images);

    Ok(Some(Category {
        name: name.to_string(),
        dir: dir.to_path_buf(),
        image: images.into_iter().next(),
        notes,
    }))
}

fn visible_utf8_name(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        None
    } else {
        Some(name)
    }
}

fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|left, right| {
        let left_name = left.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let right_name = right.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        compare_file_names(left_name, right_name)
    });
}

/// Orders file names by numeric prefix first, then lexicographically.
///
/// `2-b.md` sorts before `10-a.md`; names with a numeric prefix sort before
/// names without one. The final byte-wise tie-break makes the order total.
pub fn compare_file_names(left: &str, right: &str) -> Ordering {
    let (left_digits, left_rest) = split_numeric_prefix(left);
    let (right_digits, right_rest) = split_numeric_prefix(right);

    let prefix_order = match (left_digits, right_digits) {
        (Some(a), Some(b)) => compare_digit_runs(a, b).then_with(|| left_rest.cmp(right_rest)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left
            .to_lowercase()
            .cmp(&right.to_lowercase()),
    };
    prefix_order.then_with(|| left.cmp(right))
}

fn split_numeric_prefix(name: &str) -> (Option<&str>, &str) {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        (None, name)
    } else {
        (Some(&name[..digits]), &name[digits..])
    }
}

fn compare_digit_runs(left: &str, right: &str) -> Ordering {
    let left = left.trim_start_matches('0');
    let right = right.trim_start_matches('0');
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}
