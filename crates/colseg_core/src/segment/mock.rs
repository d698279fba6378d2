//! Mock segment files for tests and dry runs.

use crate::dir::segment_file_path;
use crate::error::{CoreError, CoreResult};
use crate::segment::handle::OpenFile;
use crate::segment::{FileType, SegmentFileOps, SegmentId};
use colseg_storage::InMemoryBackend;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory segment file that never touches the filesystem.
///
/// Behaves like the real variants, including sealing and close state.
/// [`MockSegmentFile::fail_next_close`] lets tests exercise close failures.
#[derive(Debug)]
pub struct MockSegmentFile {
    inner: OpenFile<InMemoryBackend>,
    fail_close: AtomicBool,
}

impl MockSegmentFile {
    /// Creates a mock file of the given type for `id`.
    #[must_use]
    pub fn new(dir: &Path, id: SegmentId, file_type: FileType) -> Self {
        let path = segment_file_path(dir, &id, file_type);
        Self {
            inner: OpenFile::new(id, file_type, path, InMemoryBackend::new()),
            fail_close: AtomicBool::new(false),
        }
    }

    /// Makes the next `close` report an I/O error.
    ///
    /// The file still ends up closed.
    pub fn fail_next_close(&self) {
        self.fail_close.store(true, Ordering::Release);
    }
}

impl SegmentFileOps for MockSegmentFile {
    fn id(&self) -> &SegmentId {
        self.inner.id()
    }

    fn file_type(&self) -> FileType {
        self.inner.file_type()
    }

    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn size(&self) -> CoreResult<u64> {
        self.inner.size()
    }

    fn read_at(&self, offset: u64, len: usize) -> CoreResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&self, data: &[u8]) -> CoreResult<u64> {
        self.inner.append(data)
    }

    fn sync(&self) -> CoreResult<()> {
        self.inner.sync()
    }

    fn seal(&self) -> CoreResult<()> {
        self.inner.seal()
    }

    fn is_sealed(&self) -> bool {
        self.inner.is_sealed()
    }

    fn close(&self) -> CoreResult<()> {
        let was_open = !self.inner.is_closed();
        self.inner.close()?;
        if was_open && self.fail_close.swap(false, Ordering::AcqRel) {
            return Err(CoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("injected close failure for {}", self.inner.id()),
            )));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
