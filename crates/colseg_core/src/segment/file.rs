//! The segment file capability interface and its variants.

use crate::error::CoreResult;
use crate::segment::{MockSegmentFile, SegmentId, SortedSegmentFile, UnsortedSegmentFile};
use std::fmt;
use std::path::Path;

/// Lifecycle state of a segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileType {
    /// Freshly flushed, append-oriented, not yet compacted.
    Unsorted,
    /// Compacted and immutable once sealed.
    Sorted,
}

impl FileType {
    /// File extension used on disk for this type.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Unsorted => "useg",
            Self::Sorted => "seg",
        }
    }

    /// Maps a file extension back to its type.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "useg" => Some(Self::Unsorted),
            "seg" => Some(Self::Sorted),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsorted => f.write_str("unsorted"),
            Self::Sorted => f.write_str("sorted"),
        }
    }
}

/// Operations every segment file supports.
///
/// Handles are shared through `Arc`, so every method takes `&self`.
///
/// # Closing
///
/// `close` is idempotent. The registry closes a handle only after removing
/// it from its map; callers that obtained a handle from a lookup must not
/// close it themselves. Reads and writes on a closed handle fail with
/// [`crate::CoreError::SegmentClosed`].
pub trait SegmentFileOps: Send + Sync {
    /// The segment this file is bound to.
    fn id(&self) -> &SegmentId;

    /// The lifecycle state this file represents.
    fn file_type(&self) -> FileType;

    /// Location of the file. Mock files report the path a real file would use.
    fn path(&self) -> &Path;

    /// Current size in bytes.
    ///
    /// # Errors
    ///
    /// Fails if the file is closed.
    fn size(&self) -> CoreResult<u64>;

    /// Reads a block of `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the file is closed or the range is out of bounds.
    fn read_at(&self, offset: u64, len: usize) -> CoreResult<Vec<u8>>;

    /// Appends a block and returns its offset.
    ///
    /// # Errors
    ///
    /// Fails if the file is closed or sealed.
    fn append(&self, data: &[u8]) -> CoreResult<u64>;

    /// Makes appended data durable.
    ///
    /// # Errors
    ///
    /// Fails if the file is closed or the sync fails.
    fn sync(&self) -> CoreResult<()>;

    /// Marks a sorted file as fully written. Further appends fail.
    ///
    /// # Errors
    ///
    /// Fails on unsorted files and on closed files.
    fn seal(&self) -> CoreResult<()>;

    /// Whether the file has been sealed.
    fn is_sealed(&self) -> bool;

    /// Releases the underlying resource.
    ///
    /// # Errors
    ///
    /// Fails if the final sync fails. The handle counts as closed either way.
    fn close(&self) -> CoreResult<()>;

    /// Whether the file has been closed.
    fn is_closed(&self) -> bool;

    /// One-line description for diagnostics.
    fn describe(&self) -> String {
        let state = if self.is_closed() {
            "closed"
        } else if self.is_sealed() {
            "sealed"
        } else {
            "open"
        };
        format!("{}[{}] {} ({state})", self.file_type(), self.id(), self.path().display())
    }
}

/// A segment file owned by the registry.
///
/// Which variant gets built is decided once, when the registry is created:
/// mock registries only ever produce [`SegmentFile::Mock`].
#[derive(Debug)]
pub enum SegmentFile {
    /// A freshly flushed file on disk.
    Unsorted(UnsortedSegmentFile),
    /// A compacted file on disk.
    Sorted(SortedSegmentFile),
    /// An in-memory stand-in of either type.
    Mock(MockSegmentFile),
}

impl SegmentFile {
    /// Returns the mock variant, if this is one.
    #[must_use]
    pub fn as_mock(&self) -> Option<&MockSegmentFile> {
        match self {
            Self::Mock(file) => Some(file),
            _ => None,
        }
    }

    fn ops(&self) -> &dyn SegmentFileOps {
        match self {
            Self::Unsorted(file) => file,
            Self::Sorted(file) => file,
            Self::Mock(file) => file,
        }
    }
}

impl SegmentFileOps for SegmentFile {
    fn id(&self) -> &SegmentId {
        self.ops().id()
    }

    fn file_type(&self) -> FileType {
        self.ops().file_type()
    }

    fn path(&self) -> &Path {
        self.ops().path()
    }

    fn size(&self) -> CoreResult<u64> {
        self.ops().size()
    }

    fn read_at(&self, offset: u64, len: usize) -> CoreResult<Vec<u8>> {
        self.ops().read_at(offset, len)
    }

    fn append(&self, data: &[u8]) -> CoreResult<u64> {
        self.ops().append(data)
    }

    fn sync(&self) -> CoreResult<()> {
        self.ops().sync()
    }

    fn seal(&self) -> CoreResult<()> {
        self.ops().seal()
    }

    fn is_sealed(&self) -> bool {
        self.ops().is_sealed()
    }

    fn close(&self) -> CoreResult<()> {
        self.ops().close()
    }

    fn is_closed(&self) -> bool {
        self.ops().is_closed()
    }

    fn describe(&self) -> String {
        self.ops().describe()
    }
}
