//! Segment store: a locked storage directory plus its file registry.

use crate::config::Config;
use crate::dir::DirLock;
use crate::error::{CoreError, CoreResult};
use crate::registry::SegmentFileRegistry;
use std::path::Path;
use tracing::info;

/// The storage layer as the engine opens it at startup.
///
/// In real mode the directory lock is taken before the registry is built,
/// so a second engine on the same directory fails at `open`. Mock stores
/// neither lock nor touch the directory.
#[derive(Debug)]
pub struct SegmentStore {
    files: SegmentFileRegistry,
    lock: Option<DirLock>,
}

impl SegmentStore {
    /// Opens the store rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DirectoryLocked`] if another engine holds the
    /// directory, [`CoreError::InvalidDirectory`] if it is missing and
    /// `create_if_missing` is off, or an I/O error.
    pub fn open(path: &Path, config: Config) -> CoreResult<Self> {
        let lock = if config.mock {
            None
        } else {
            Some(DirLock::acquire_with(path, config.create_if_missing)?)
        };

        info!(dir = %path.display(), mock = config.mock, "opened segment store");
        Ok(Self {
            files: SegmentFileRegistry::with_config(path, &config),
            lock,
        })
    }

    /// Opens a mock store whose files live only in memory.
    #[must_use]
    pub fn open_in_memory() -> Self {
        Self {
            files: SegmentFileRegistry::with_config("mock", &Config::default().mock(true)),
            lock: None,
        }
    }

    /// Returns the segment file registry.
    #[must_use]
    pub fn files(&self) -> &SegmentFileRegistry {
        &self.files
    }

    /// Returns the directory lock, if this store holds one.
    #[must_use]
    pub fn lock(&self) -> Option<&DirLock> {
        self.lock.as_ref()
    }

    /// Closes every segment file, then releases the directory lock.
    ///
    /// # Errors
    ///
    /// Propagates a fatal close failure from the registry (see
    /// [`SegmentFileRegistry::close_all`]) or an unlock error.
    pub fn close(self) -> CoreResult<()> {
        self.files.close_all()?;
        match self.lock {
            Some(lock) => lock.release(),
            None => Ok(()),
        }
    }
}

/// Fails if `path` is locked by a live store.
///
/// Convenience for tools that must not run against an engine's directory.
///
/// # Errors
///
/// Returns [`CoreError::DirectoryLocked`] if it is, or an I/O error.
pub fn ensure_unlocked(path: &Path) -> CoreResult<()> {
    if DirLock::is_locked(path)? {
        return Err(CoreError::DirectoryLocked {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
