//! Segment files and their identities.
//!
//! A segment is stored as exactly one physical file at a time. While freshly
//! flushed it lives in an *unsorted* file (`<id>.useg`); compaction rewrites
//! it into a *sorted* file (`<id>.seg`) and the unsorted file is retired.

mod file;
mod handle;
mod id;
mod mock;
mod sorted;
mod unsorted;

pub use file::{FileType, SegmentFile, SegmentFileOps};
pub use id::SegmentId;
pub use mock::MockSegmentFile;
pub use sorted::SortedSegmentFile;
pub use unsorted::UnsortedSegmentFile;
