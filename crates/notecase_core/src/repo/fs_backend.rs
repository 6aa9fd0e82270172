//! Note storage contract and filesystem implementation.
//!
//! # Responsibility
//! - Define the backend contract consumed by the presentation layer.
//! - Serve categories and notes from `storage_root/<category>/*.md`.
//! - Persist edits with atomic replace semantics.
//!
//! # Invariants
//! - The inventory is only ever replaced whole: `rescan` builds a new
//!   `CategoryIndex` and swaps the `Arc` under a write lock.
//! - Load/save failures are returned as `NoteError`; a failing note never
//!   invalidates the rest of a listing.
//! - A loaded note is only written back to the file it was read from.
//! - `create_note` leaves no file behind when it reports failure.
//! - Note bodies are never written to logs.

use crate::config::CoreConfig;
use crate::error::{NotFoundTarget, NoteError, NoteResult};
use crate::events::{BackendEvent, SubscriptionId, Subscribers};
use crate::model::block::BlockKind;
use crate::model::category::{Category, NoteHandle};
use crate::model::note::MarkdownNote;
use crate::parser::{derive_title_preview, parse};
use crate::repo::atomic::{create_unique_file, replace_file};
use crate::repo::category_index::CategoryIndex;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

static SLUG_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

const DEFAULT_NOTE_STEM: &str = "note";
const MAX_SLUG_CHARS: usize = 48;

/// Storage contract used by the UI controller and the edit workflow.
pub trait NoteBackend {
    /// Names of categories in the current inventory.
    fn categories(&self) -> BTreeSet<String>;
    /// Notes of one category in index order.
    fn list_notes(&self, category: &str) -> NoteResult<Vec<NoteHandle>>;
    /// Reads and parses one note.
    fn load_note(&self, category: &str, index: usize) -> NoteResult<MarkdownNote>;
    /// Replaces the content of an existing note.
    fn save_note(&self, category: &str, index: usize, text: &str) -> NoteResult<()>;
    /// Replaces the content of `note`, failing with `NotFound(NoteFile)` when
    /// the current inventory no longer maps its category and index to its
    /// file.
    fn save_loaded_note(&self, note: &MarkdownNote, text: &str) -> NoteResult<()>;
    /// Writes a new note into `category` and returns it loaded.
    fn create_note(&self, category: &str, text: &str) -> NoteResult<MarkdownNote>;
    /// Image asset of a category, if one exists.
    fn category_image(&self, category: &str) -> Option<PathBuf>;
    /// Creates an empty category directory.
    fn create_category(&self, name: &str) -> NoteResult<()>;
    /// Rebuilds the inventory; returns the number of categories.
    fn rescan(&self) -> NoteResult<usize>;
}

/// Filesystem-backed note storage.
pub struct FileSystemBackend {
    config: Arc<CoreConfig>,
    inventory: RwLock<Arc<CategoryIndex>>,
    subscribers: Subscribers,
}

impl FileSystemBackend {
    /// Opens the storage root from `config` and performs the first scan.
    ///
    /// # Errors
    /// - `NotFound(StorageRoot)` when the root is missing and
    ///   `config.create_root` is `false`.
    /// - `Io` when the root cannot be created or listed.
    pub fn open(config: Arc<CoreConfig>) -> NoteResult<Self> {
        let root = config.storage_root.clone();
        if config.create_root && !root.exists() {
            std::fs::create_dir_all(&root).map_err(|err| NoteError::io(&root, err))?;
            info!(
                "event=storage_open module=repo status=created root={}",
                root.display()
            );
        }

        let index = CategoryIndex::scan(&config)?;
        Ok(Self {
            config,
            inventory: RwLock::new(Arc::new(index)),
            subscribers: Subscribers::new(),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Current inventory snapshot; later rescans do not affect it.
    pub fn inventory(&self) -> Arc<CategoryIndex> {
        let guard = self.inventory.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Registers a change listener.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&BackendEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn replace_inventory(&self, index: CategoryIndex) -> usize {
        let count = index.len();
        let mut guard = self.inventory.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(index);
        count
    }

    fn note_path(&self, category: &str, index: usize) -> NoteResult<PathBuf> {
        let inventory = self.inventory();
        let entry = lookup_category(&inventory, category)?;
        entry
            .note_path(index)
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                NoteError::NotFound(NotFoundTarget::Note {
                    category: category.to_string(),
                    index,
                })
            })
    }

    fn category_dir(&self, name: &str) -> NoteResult<PathBuf> {
        validate_category_name(name)?;
        Ok(self.config.storage_root.join(name))
    }
}

impl NoteBackend for FileSystemBackend {
    fn categories(&self) -> BTreeSet<String> {
        self.inventory().names()
    }

    fn list_notes(&self, category: &str) -> NoteResult<Vec<NoteHandle>> {
        let inventory = self.inventory();
        let entry = lookup_category(&inventory, category)?;
        let handles = entry
            .notes
            .iter()
            .enumerate()
            .map(|(index, path)| NoteHandle {
                index,
                file_name: file_name_of(path),
                title_preview: self.title_preview(path),
            })
            .collect();
        Ok(handles)
    }

    fn load_note(&self, category: &str, index: usize) -> NoteResult<MarkdownNote> {
        let started_at = Instant::now();
        let result = self
            .note_path(category, index)
            .and_then(|path| MarkdownNote::load(category, index, path, self.config.encoding));
        match &result {
            Ok(note) => info!(
                "event=note_load module=repo status=ok category={} index={} bytes={} blocks={} duration_ms={}",
                category,
                index,
                note.raw_text().len(),
                note.blocks().len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=note_load module=repo status=error category={} index={} error_code={} error={}",
                category,
                index,
                err.error_code(),
                err
            ),
        }
        result
    }

    fn save_note(&self, category: &str, index: usize, text: &str) -> NoteResult<()> {
        self.write_note(category, index, None, text)
    }

    fn save_loaded_note(&self, note: &MarkdownNote, text: &str) -> NoteResult<()> {
        self.write_note(note.category(), note.index(), Some(note.path()), text)
    }

    fn create_note(&self, category: &str, text: &str) -> NoteResult<MarkdownNote> {
        let dir = self.category_dir(category)?;
        if !dir.is_dir() {
            return Err(NoteError::NotFound(NotFoundTarget::Category(
                category.to_string(),
            )));
        }

        let stem = note_stem(text);
        let placeholder = dir.join(format!("{stem}.{}", self.config.primary_note_extension()));
        let bytes = self.config.encoding.encode(&placeholder, text)?;
        let path = match create_unique_file(&dir, &stem, self.config.primary_note_extension(), &bytes) {
            Ok(path) => path,
            Err(err) => {
                error!(
                    "event=note_create module=repo status=error category={} error_code={} error={}",
                    category,
                    err.error_code(),
                    err
                );
                return Err(err);
            }
        };

        let index = match self.index_created(category, &path) {
            Ok(index) => index,
            Err(err) => {
                let removed = std::fs::remove_file(&path).is_ok();
                error!(
                    "event=note_create module=repo status=rolled_back category={} removed={} error_code={} error={}",
                    category,
                    removed,
                    err.error_code(),
                    err
                );
                return Err(err);
            }
        };
        info!(
            "event=note_create module=repo status=ok category={} index={} bytes={}",
            category,
            index,
            bytes.len()
        );
        self.subscribers.emit(&BackendEvent::NoteCreated {
            category: category.to_string(),
            index,
        });

        Ok(MarkdownNote::from_text(category, index, path, text))
    }

    fn category_image(&self, category: &str) -> Option<PathBuf> {
        self.inventory()
            .get(category)
            .and_then(|entry| entry.image.clone())
    }

    fn create_category(&self, name: &str) -> NoteResult<()> {
        let dir = self.category_dir(name)?;
        if dir.is_dir() {
            return Ok(());
        }
        match std::fs::create_dir(&dir) {
            Ok(()) => {
                info!("event=category_create module=repo status=ok category={name}");
                self.subscribers.emit(&BackendEvent::CategoryCreated {
                    name: name.to_string(),
                });
                Ok(())
            }
            Err(err) => {
                let err = NoteError::io(&dir, err);
                error!(
                    "event=category_create module=repo status=error category={} error_code={} error={}",
                    name,
                    err.error_code(),
                    err
                );
                Err(err)
            }
        }
    }

    fn rescan(&self) -> NoteResult<usize> {
        let index = CategoryIndex::scan(&self.config)?;
        let count = self.replace_inventory(index);
        self.subscribers
            .emit(&BackendEvent::Refreshed { categories: count });
        Ok(count)
    }
}

impl FileSystemBackend {
    fn write_note(
        &self,
        category: &str,
        index: usize,
        expected: Option<&Path>,
        text: &str,
    ) -> NoteResult<()> {
        let started_at = Instant::now();
        let result = self.note_path(category, index).and_then(|path| {
            if let Some(expected) = expected.filter(|expected| *expected != path.as_path()) {
                return Err(NoteError::NotFound(NotFoundTarget::NoteFile(
                    expected.to_path_buf(),
                )));
            }
            let bytes = self.config.encoding.encode(&path, text)?;
            replace_file(&path, &bytes)?;
            Ok(bytes.len())
        });
        match result {
            Ok(bytes) => {
                info!(
                    "event=note_save module=repo status=ok category={} index={} bytes={} duration_ms={}",
                    category,
                    index,
                    bytes,
                    started_at.elapsed().as_millis()
                );
                self.subscribers.emit(&BackendEvent::NoteSaved {
                    category: category.to_string(),
                    index,
                });
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=note_save module=repo status=error category={} index={} error_code={} error={}",
                    category,
                    index,
                    err.error_code(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Rescans and returns the index `path` received in `category`.
    fn index_created(&self, category: &str, path: &Path) -> NoteResult<usize> {
        self.rescan()?;
        self.inventory()
            .get(category)
            .and_then(|entry| entry.index_of(path))
            .ok_or_else(|| NoteError::NotFound(NotFoundTarget::NoteFile(path.to_path_buf())))
    }

    fn title_preview(&self, path: &Path) -> String {
        let preview = std::fs::read(path)
            .map_err(|err| NoteError::from_read(path, err))
            .and_then(|bytes| self.config.encoding.decode(path, bytes))
            .map(|text| derive_title_preview(&text));
        match preview {
            Ok(Some(title)) => title,
            Ok(None) => file_stem_of(path),
            Err(err) => {
                warn!(
                    "event=note_preview module=repo status=degraded error_code={} path={}",
                    err.error_code(),
                    path.display()
                );
                file_stem_of(path)
            }
        }
    }
}

fn lookup_category<'a>(inventory: &'a CategoryIndex, name: &str) -> NoteResult<&'a Category> {
    inventory
        .get(name)
        .ok_or_else(|| NoteError::NotFound(NotFoundTarget::Category(name.to_string())))
}

/// Rejects names that are empty, hidden, or would escape the storage root.
pub fn validate_category_name(name: &str) -> NoteResult<()> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed != name
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(NoteError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// File stem for a new note: slug of its first heading, else `note`.
fn note_stem(text: &str) -> String {
    let heading = parse(text).into_iter().find_map(|block| match block.kind {
        BlockKind::Heading { text, .. } => Some(text),
        _ => None,
    });
    let Some(heading) = heading else {
        return DEFAULT_NOTE_STEM.to_string();
    };
    let lowered = heading.to_lowercase();
    let slug = SLUG_SEPARATOR_RE.replace_all(&lowered, "-");
    let slug = slug
        .trim_matches('-')
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect::<String>();
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        DEFAULT_NOTE_STEM.to_string()
    } else {
        slug.to_string()
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{note_stem, validate_category_name};

    #[test]
    fn note_stem_slugs_first_heading() {
        assert_eq!(note_stem("# Grocery List: Week 3!\nmilk"), "grocery-list-week-3");
        assert_eq!(note_stem("no heading here"), "note");
        assert_eq!(note_stem("# ???"), "note");
    }

    #[test]
    fn category_names_cannot_escape_root() {
        assert!(validate_category_name("recipes").is_ok());
        assert!(validate_category_name("My Notes").is_ok());
        for bad in ["", " ", "..", ".hidden", "a/b", "a\\b", " padded"] {
            assert!(validate_category_name(bad).is_err(), "`{bad}` should be rejected");
        }
    }
}
