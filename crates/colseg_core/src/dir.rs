//! Storage directory layout and the directory lock.
//!
//! ```text
//! <dir>/
//! ├─ COLSEG.lock       # Advisory lock, one engine process per directory
//! ├─ 1_0_a_7.useg      # Unsorted segment file
//! └─ 1_0_a_3.seg       # Sorted segment file
//! ```
//!
//! Segment files are named `<segment id>.<extension>`, one per
//! (segment, file type) pair.

use crate::error::{CoreError, CoreResult};
use crate::segment::{FileType, SegmentId};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Name of the lock sentinel, without extension.
pub const LOCK_NAME: &str = "COLSEG";

/// Extension of the lock sentinel.
const LOCK_EXTENSION: &str = "lock";

/// Returns the path of the lock sentinel inside `dir`.
#[must_use]
pub fn lock_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("{LOCK_NAME}.{LOCK_EXTENSION}"))
}

/// Returns the path of the file backing `id` in the given state.
#[must_use]
pub fn segment_file_path(dir: &Path, id: &SegmentId, file_type: FileType) -> PathBuf {
    dir.join(format!("{id}.{}", file_type.extension()))
}

/// Exclusive ownership of a storage directory.
///
/// Holds an OS advisory lock on the sentinel file for as long as it lives.
/// Dropping it, or calling [`DirLock::release`], unlocks and closes the file.
///
/// This only guards against a second engine opening the same directory; it
/// has nothing to do with the in-memory segment registry.
///
/// # Example
///
/// ```rust,ignore
/// use colseg_core::DirLock;
/// use std::path::Path;
///
/// let lock = DirLock::acquire(Path::new("data"))?;
/// // ... run the engine ...
/// lock.release()?;
/// ```
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    file: Option<File>,
}

impl DirLock {
    /// Locks `path`, creating it (and its parents) if missing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DirectoryLocked`] if another holder has the lock,
    /// or an I/O error if the directory or sentinel cannot be opened.
    pub fn acquire(path: &Path) -> CoreResult<Self> {
        Self::acquire_with(path, true)
    }

    /// Locks `path`, creating it only if `create_if_missing` is set.
    ///
    /// # Errors
    ///
    /// Additionally fails with [`CoreError::InvalidDirectory`] if the
    /// directory is missing and may not be created, or is not a directory.
    pub fn acquire_with(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_directory(format!(
                    "storage directory does not exist: {}",
                    path.display()
                )));
            }
        }
        if !path.is_dir() {
            return Err(CoreError::invalid_directory(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = lock_file_path(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        // The sentinel handle is dropped (closed) on every error path.
        if let Err(err) = file.try_lock_exclusive() {
            if err.kind() == fs2::lock_contended_error().kind() {
                error!(dir = %path.display(), "storage directory is locked by another holder");
                return Err(CoreError::DirectoryLocked {
                    path: path.to_path_buf(),
                });
            }
            error!(dir = %path.display(), %err, "failed to lock storage directory");
            return Err(err.into());
        }

        info!(dir = %path.display(), "storage directory locked");
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    /// Reports whether some holder currently has `path` locked.
    ///
    /// Probes by briefly taking the exclusive lock itself and releasing it
    /// at once, so the check is not free of side effects: a concurrent
    /// [`DirLock::acquire`] on the same directory can fail with
    /// [`CoreError::DirectoryLocked`] during that window. A directory
    /// without a sentinel file is unlocked and is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sentinel exists but cannot be opened.
    pub fn is_locked(path: &Path) -> CoreResult<bool> {
        let lock_path = lock_file_path(path);
        if !lock_path.exists() {
            return Ok(false);
        }

        let file = OpenOptions::new().read(true).write(true).open(&lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                file.unlock()?;
                Ok(false)
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(true),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the locked directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the sentinel file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        lock_file_path(&self.path)
    }

    /// Unlocks the directory and closes the sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses the unlock. The file is closed
    /// regardless, which also drops the lock.
    pub fn release(mut self) -> CoreResult<()> {
        match self.file.take() {
            Some(file) => {
                file.unlock()?;
                info!(dir = %self.path.display(), "storage directory unlocked");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(err) = file.unlock() {
                error!(dir = %self.path.display(), %err, "failed to unlock storage directory");
            }
        }
    }
}

/// A segment file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFileEntry {
    /// The segment the file belongs to.
    pub id: SegmentId,
    /// Whether the file is unsorted or sorted.
    pub file_type: FileType,
    /// Full path of the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Lists the segment files in `dir`, ordered by segment id then file type.
///
/// Files that don't follow the naming scheme, including the lock sentinel,
/// are skipped.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be read.
pub fn scan_segment_files(dir: &Path) -> CoreResult<Vec<SegmentFileEntry>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let path = entry.path();
        let Some(file_type) = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(FileType::from_extension)
        else {
            continue;
        };
        let Some(Ok(id)) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::parse::<SegmentId>)
        else {
            continue;
        };

        entries.push(SegmentFileEntry {
            id,
            file_type,
            path,
            size: metadata.len(),
        });
    }

    entries.sort_by(|a, b| (&a.id, a.file_type).cmp(&(&b.id, b.file_type)));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_creates_directory() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("nested").join("data");

        let lock = DirLock::acquire(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(lock.path(), dir);
        assert_eq!(lock.lock_path(), dir.join("COLSEG.lock"));
        assert!(lock.lock_path().exists());
    }

    #[test]
    fn acquire_fails_if_missing_and_no_create() {
        let temp = tempdir().unwrap();
        let result = DirLock::acquire_with(&temp.path().join("missing"), false);
        assert!(matches!(result, Err(CoreError::InvalidDirectory { .. })));
    }

    #[test]
    fn acquire_fails_on_regular_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("not_a_dir");
        fs::write(&file, b"x").unwrap();

        let result = DirLock::acquire(&file);
        assert!(matches!(result, Err(CoreError::InvalidDirectory { .. })));
    }

    #[test]
    fn lock_prevents_second_acquire() {
        let temp = tempdir().unwrap();
        let _first = DirLock::acquire(temp.path()).unwrap();

        let second = DirLock::acquire(temp.path());
        assert!(matches!(second, Err(CoreError::DirectoryLocked { .. })));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        {
            let _lock = DirLock::acquire(temp.path()).unwrap();
        }
        let _again = DirLock::acquire(temp.path()).unwrap();
    }

    #[test]
    fn explicit_release_allows_reacquire() {
        let temp = tempdir().unwrap();
        let lock = DirLock::acquire(temp.path()).unwrap();
        assert!(DirLock::is_locked(temp.path()).unwrap());

        lock.release().unwrap();
        assert!(!DirLock::is_locked(temp.path()).unwrap());
        let _again = DirLock::acquire(temp.path()).unwrap();
    }

    #[test]
    fn unlocked_without_sentinel() {
        let temp = tempdir().unwrap();
        assert!(!DirLock::is_locked(temp.path()).unwrap());
        assert!(!lock_file_path(temp.path()).exists());
    }

    #[test]
    fn status_check_releases_its_lock() {
        let temp = tempdir().unwrap();
        DirLock::acquire(temp.path()).unwrap().release().unwrap();

        for _ in 0..3 {
            assert!(!DirLock::is_locked(temp.path()).unwrap());
        }
        let lock = DirLock::acquire(temp.path()).unwrap();
        assert!(DirLock::is_locked(temp.path()).unwrap());
        drop(lock);
    }

    #[test]
    fn segment_paths() {
        let dir = Path::new("/data");
        let id = SegmentId::new(1, 0, "a", 7);

        assert_eq!(
            segment_file_path(dir, &id, FileType::Unsorted),
            Path::new("/data/1_0_a_7.useg")
        );
        assert_eq!(
            segment_file_path(dir, &id, FileType::Sorted),
            Path::new("/data/1_0_a_7.seg")
        );
    }

    #[test]
    fn scan_finds_segment_files_only() {
        let temp = tempdir().unwrap();
        let _lock = DirLock::acquire(temp.path()).unwrap();
        fs::write(temp.path().join("2_0_b_1.seg"), b"sorted").unwrap();
        fs::write(temp.path().join("1_0_a_7.useg"), b"").unwrap();
        fs::write(temp.path().join("1_0_a_7.seg"), b"").unwrap();
        fs::write(temp.path().join("notes.txt"), b"").unwrap();
        fs::write(temp.path().join("garbage.seg"), b"").unwrap();
        fs::create_dir(temp.path().join("3_0_c_1.seg")).unwrap();

        let entries = scan_segment_files(temp.path()).unwrap();
        let found: Vec<(String, FileType, u64)> = entries
            .iter()
            .map(|e| (e.id.to_string(), e.file_type, e.size))
            .collect();

        assert_eq!(
            found,
            [
                ("1_0_a_7".to_string(), FileType::Unsorted, 0),
                ("1_0_a_7".to_string(), FileType::Sorted, 0),
                ("2_0_b_1".to_string(), FileType::Sorted, 6),
            ]
        );
    }
}
