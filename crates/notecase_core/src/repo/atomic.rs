//! Atomic file replacement helpers.
//!
//! # Invariants
//! - Content is staged in a hidden temp file in the target directory, flushed
//!   to disk, then renamed over the target. Readers see the old bytes or the
//!   new bytes, never a mix.
//! - A failed write leaves the target untouched and removes the temp file.

use crate::error::{NoteError, NoteResult};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const TEMP_PREFIX: &str = ".notecase-";
const TEMP_SUFFIX: &str = ".tmp";
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Atomically replaces `path` with `bytes`.
///
/// Existing file permissions are carried over to the new file.
pub(crate) fn replace_file(path: &Path, bytes: &[u8]) -> NoteResult<()> {
    let dir = parent_dir(path)?;
    let temp = stage(dir, bytes)?;
    if let Ok(metadata) = std::fs::metadata(path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|err| NoteError::io(temp.path(), err))?;
    }
    temp.persist(path)
        .map_err(|err| NoteError::io(path, err.error))?;
    Ok(())
}

/// Atomically creates a new file in `dir`, never overwriting.
///
/// Tries `{stem}.{ext}`, then `{stem}-2.{ext}`, `{stem}-3.{ext}`... and
/// returns the path that was created.
pub(crate) fn create_unique_file(
    dir: &Path,
    stem: &str,
    ext: &str,
    bytes: &[u8],
) -> NoteResult<PathBuf> {
    let mut temp = stage(dir, bytes)?;
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let file_name = if attempt == 1 {
            format!("{stem}.{ext}")
        } else {
            format!("{stem}-{attempt}.{ext}")
        };
        let target = dir.join(file_name);
        match temp.persist_noclobber(&target) {
            Ok(_) => return Ok(target),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => temp = err.file,
            Err(err) => return Err(NoteError::io(target, err.error)),
        }
    }
    Err(NoteError::io(
        dir,
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free file name for `{stem}.{ext}`"),
        ),
    ))
}

fn stage(dir: &Path, bytes: &[u8]) -> NoteResult<NamedTempFile> {
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(|err| NoteError::io(dir, err))?;
    temp.write_all(bytes)
        .map_err(|err| NoteError::io(temp.path(), err))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| NoteError::io(temp.path(), err))?;
    Ok(temp)
}

fn parent_dir(path: &Path) -> NoteResult<&Path> {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or_else(|| {
            NoteError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::{create_unique_file, replace_file};

    #[test]
    fn replace_file_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "old content that is longer").unwrap();

        replace_file(&path, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn replace_file_into_missing_directory_fails_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("note.md");
        let err = replace_file(&path, b"x").unwrap_err();
        assert_eq!(err.error_code(), "io_failed");
        assert!(!path.exists());
    }

    #[test]
    fn create_unique_file_never_clobbers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plan.md"), "keep").unwrap();

        let created = create_unique_file(dir.path(), "plan", "md", b"fresh").unwrap();

        assert_eq!(created, dir.path().join("plan-2.md"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("plan.md")).unwrap(),
            "keep"
        );
        assert_eq!(std::fs::read_to_string(created).unwrap(), "fresh");
    }
}
