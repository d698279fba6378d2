//! Open/closed state shared by all segment file variants.

use crate::error::{CoreError, CoreResult};
use crate::segment::{FileType, SegmentId};
use colseg_storage::{StorageBackend, StorageResult};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// A backend bound to one segment id, plus its seal flag.
///
/// `None` in `backend` means closed. Sealing and appending both take the
/// write lock, so an append can never land after a seal.
#[derive(Debug)]
pub(crate) struct OpenFile<B> {
    id: SegmentId,
    file_type: FileType,
    path: PathBuf,
    sync_on_close: bool,
    backend: RwLock<Option<B>>,
    sealed: AtomicBool,
}

impl<B: StorageBackend> OpenFile<B> {
    pub(crate) fn new(id: SegmentId, file_type: FileType, path: PathBuf, backend: B) -> Self {
        Self {
            id,
            file_type,
            path,
            sync_on_close: true,
            backend: RwLock::new(Some(backend)),
            sealed: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_sync_on_close(&mut self, value: bool) {
        self.sync_on_close = value;
    }

    pub(crate) fn id(&self) -> &SegmentId {
        &self.id
    }

    pub(crate) fn file_type(&self) -> FileType {
        self.file_type
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn closed(&self) -> CoreError {
        CoreError::SegmentClosed {
            id: self.id.clone(),
        }
    }

    fn with_backend<T>(&self, f: impl FnOnce(&B) -> StorageResult<T>) -> CoreResult<T> {
        let guard = self.backend.read();
        let backend = guard.as_ref().ok_or_else(|| self.closed())?;
        Ok(f(backend)?)
    }

    pub(crate) fn size(&self) -> CoreResult<u64> {
        self.with_backend(|backend| backend.size())
    }

    pub(crate) fn read_at(&self, offset: u64, len: usize) -> CoreResult<Vec<u8>> {
        self.with_backend(|backend| backend.read_at(offset, len))
    }

    pub(crate) fn append(&self, data: &[u8]) -> CoreResult<u64> {
        let mut guard = self.backend.write();
        let backend = guard.as_mut().ok_or_else(|| self.closed())?;
        if self.sealed.load(Ordering::Acquire) {
            return Err(CoreError::SegmentSealed {
                id: self.id.clone(),
            });
        }
        Ok(backend.append(data)?)
    }

    pub(crate) fn sync(&self) -> CoreResult<()> {
        let mut guard = self.backend.write();
        let backend = guard.as_mut().ok_or_else(|| self.closed())?;
        Ok(backend.sync()?)
    }

    pub(crate) fn seal(&self) -> CoreResult<()> {
        if self.file_type != FileType::Sorted {
            return Err(CoreError::invalid_operation(format!(
                "cannot seal unsorted segment {}",
                self.id
            )));
        }

        let mut guard = self.backend.write();
        let backend = guard.as_mut().ok_or_else(|| self.closed())?;
        backend.sync()?;
        self.sealed.store(true, Ordering::Release);
        Ok(())
    }

    pub(crate) fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Takes the backend out, then syncs it if configured. The file counts as
    /// closed even if that sync fails.
    pub(crate) fn close(&self) -> CoreResult<()> {
        let Some(mut backend) = self.backend.write().take() else {
            return Ok(());
        };
        if self.sync_on_close {
            backend.sync()?;
        }
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.backend.read().is_none()
    }
}
