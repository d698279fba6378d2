//! Sorted segment files.

use crate::dir::segment_file_path;
use crate::error::CoreResult;
use crate::segment::handle::OpenFile;
use crate::segment::{FileType, SegmentFileOps, SegmentId};
use colseg_storage::FileBackend;
use std::path::Path;

/// A compacted segment file.
///
/// The compactor appends the sorted blocks and then calls
/// [`SegmentFileOps::seal`]; after that the file is read-only.
#[derive(Debug)]
pub struct SortedSegmentFile {
    inner: OpenFile<FileBackend>,
}

impl SortedSegmentFile {
    /// Opens or creates the sorted file for `id` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(dir: &Path, id: SegmentId) -> CoreResult<Self> {
        let path = segment_file_path(dir, &id, FileType::Sorted);
        let backend = FileBackend::open_with_create_dirs(&path)?;
        Ok(Self {
            inner: OpenFile::new(id, FileType::Sorted, path, backend),
        })
    }

    /// Sets whether the file is synced on close. Defaults to `true`.
    #[must_use]
    pub fn sync_on_close(mut self, value: bool) -> Self {
        self.inner.set_sync_on_close(value);
        self
    }
}

impl SegmentFileOps for SortedSegmentFile {
    fn id(&self) -> &SegmentId {
        self.inner.id()
    }

    fn file_type(&self) -> FileType {
        FileType::Sorted
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
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
