//! Segment file registry.
//!
//! Tracks which file is currently authoritative for each segment. A segment
//! is either *unsorted* (freshly flushed) or *sorted* (compacted), never
//! both. [`SegmentFileRegistry::upgrade`] is the only way to move a segment
//! from one state to the other, and it retires the stale unsorted file.
//!
//! ## Locking
//!
//! Both maps sit behind one `RwLock`. Every mutation takes the write guard
//! for its whole duration, including file creation, so mutations are totally
//! ordered and a reader never sees a segment in both maps.
//!
//! ## Invariant violations
//!
//! Upgrading a segment that was never registered, upgrading one that is
//! already sorted, and failing to close a resident file all mean the
//! caller's bookkeeping no longer matches the registry's. The registry logs
//! its full contents and then either panics or returns
//! [`CoreError::InvariantViolation`], depending on [`InvariantPolicy`].

use crate::config::{Config, InvariantPolicy};
use crate::error::{CoreError, CoreResult};
use crate::segment::{
    FileType, MockSegmentFile, SegmentFile, SegmentFileOps, SegmentId, SortedSegmentFile,
    UnsortedSegmentFile,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Both maps, guarded together.
#[derive(Debug, Default)]
struct Files {
    unsorted: HashMap<SegmentId, Arc<SegmentFile>>,
    sorted: HashMap<SegmentId, Arc<SegmentFile>>,
}

/// Registry of the segment files in one storage directory.
///
/// Construct one per directory and pass it to whoever flushes or compacts
/// segments. Several registries may coexist.
///
/// Handles returned by lookups are shared views: the registry stays their
/// owner and is the only one that closes them.
///
/// # Example
///
/// ```rust
/// use colseg_core::{SegmentFileOps, SegmentFileRegistry, SegmentId};
///
/// let registry = SegmentFileRegistry::new("data", true);
/// let id = SegmentId::new(1, 0, "a", 7);
///
/// registry.register_unsorted(&id).unwrap();
/// let sorted = registry.upgrade(&id).unwrap();
///
/// assert!(registry.get_unsorted(&id).is_none());
/// assert!(!sorted.is_closed());
/// ```
pub struct SegmentFileRegistry {
    dir: PathBuf,
    mock: bool,
    sync_on_close: bool,
    policy: InvariantPolicy,
    files: RwLock<Files>,
}

impl SegmentFileRegistry {
    /// Creates a registry for `dir` with default settings.
    ///
    /// With `mock` set, every file the registry creates is an in-memory
    /// [`MockSegmentFile`] and the directory is never touched.
    pub fn new(dir: impl Into<PathBuf>, mock: bool) -> Self {
        Self::with_config(dir, &Config::default().mock(mock))
    }

    /// Creates a registry for `dir` from a store configuration.
    pub fn with_config(dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            dir: dir.into(),
            mock: config.mock,
            sync_on_close: config.sync_on_close,
            policy: config.invariant_policy,
            files: RwLock::new(Files::default()),
        }
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns `true` if this registry creates mock files.
    #[must_use]
    pub fn is_mock(&self) -> bool {
        self.mock
    }

    /// Returns the invariant violation policy.
    #[must_use]
    pub fn invariant_policy(&self) -> InvariantPolicy {
        self.policy
    }

    fn create_file(&self, id: &SegmentId, file_type: FileType) -> CoreResult<Arc<SegmentFile>> {
        let file = if self.mock {
            SegmentFile::Mock(MockSegmentFile::new(&self.dir, id.clone(), file_type))
        } else {
            match file_type {
                FileType::Unsorted => SegmentFile::Unsorted(
                    UnsortedSegmentFile::create(&self.dir, id.clone())?
                        .sync_on_close(self.sync_on_close),
                ),
                FileType::Sorted => SegmentFile::Sorted(
                    SortedSegmentFile::create(&self.dir, id.clone())?
                        .sync_on_close(self.sync_on_close),
                ),
            }
        };
        Ok(Arc::new(file))
    }

    /// Registers a freshly flushed segment and creates its unsorted file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateSegment`] if `id` already has an
    /// unsorted file, [`CoreError::InvalidSegmentName`] if the tablet name
    /// cannot be part of a file name, or an I/O error if the file cannot be
    /// created. The registry is unchanged on error.
    ///
    /// A segment that is already sorted is also rejected: sorted is terminal.
    pub fn register_unsorted(&self, id: &SegmentId) -> CoreResult<Arc<SegmentFile>> {
        id.validate()?;
        let mut files = self.files.write();
        if files.unsorted.contains_key(id) || files.sorted.contains_key(id) {
            warn!(segment = %id, "segment already registered");
            return Err(CoreError::duplicate(id, FileType::Unsorted));
        }

        let file = self.create_file(id, FileType::Unsorted)?;
        files.unsorted.insert(id.clone(), Arc::clone(&file));
        debug!(segment = %id, mock = self.mock, "registered unsorted segment file");
        Ok(file)
    }

    /// Registers a segment that is already compacted, e.g. during recovery.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateSegment`] if `id` is tracked in either
    /// state, [`CoreError::InvalidSegmentName`] if the tablet name cannot be
    /// part of a file name, or an I/O error if the file cannot be created.
    /// The registry is unchanged on error.
    pub fn register_sorted(&self, id: &SegmentId) -> CoreResult<Arc<SegmentFile>> {
        id.validate()?;
        let mut files = self.files.write();
        if files.unsorted.contains_key(id) || files.sorted.contains_key(id) {
            warn!(segment = %id, "segment already registered");
            return Err(CoreError::duplicate(id, FileType::Sorted));
        }

        let file = self.create_file(id, FileType::Sorted)?;
        files.sorted.insert(id.clone(), Arc::clone(&file));
        debug!(segment = %id, mock = self.mock, "registered sorted segment file");
        Ok(file)
    }

    /// Replaces the unsorted file of `id` with a new sorted file.
    ///
    /// The stale unsorted file is removed and closed before the sorted file
    /// is inserted; callers still holding the old handle see it closed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error, with the registry unchanged, if the sorted file
    /// cannot be created.
    ///
    /// # Panics
    ///
    /// Under [`InvariantPolicy::Panic`], panics if `id` has no unsorted file,
    /// if `id` already has a sorted file, or if closing the stale file fails.
    /// Under [`InvariantPolicy::Propagate`] these return
    /// [`CoreError::InvariantViolation`] instead.
    pub fn upgrade(&self, id: &SegmentId) -> CoreResult<Arc<SegmentFile>> {
        const OP: &str = "upgrade";
        let mut files = self.files.write();

        if !files.unsorted.contains_key(id) {
            return Err(self.violation(&files, OP, id, "segment has no unsorted file"));
        }
        if files.sorted.contains_key(id) {
            // The stale file is retired even though the upgrade cannot go on.
            let mut message = String::from("segment already has a sorted file");
            if let Some(stale) = files.unsorted.remove(id) {
                if let Err(err) = stale.close() {
                    message.push_str(&format!("; failed to close stale unsorted file: {err}"));
                }
            }
            return Err(self.violation(&files, OP, id, message));
        }

        let sorted = self.create_file(id, FileType::Sorted)?;

        if let Some(stale) = files.unsorted.remove(id) {
            if let Err(err) = stale.close() {
                if let Err(close_err) = sorted.close() {
                    error!(segment = %id, err = %close_err, "failed to close new sorted file");
                }
                let message = format!("failed to close stale unsorted file: {err}");
                return Err(self.violation(&files, OP, id, message));
            }
        }

        files.sorted.insert(id.clone(), Arc::clone(&sorted));
        debug!(segment = %id, "upgraded segment file to sorted");
        Ok(sorted)
    }

    /// Returns the unsorted file of `id`, if any.
    #[must_use]
    pub fn get_unsorted(&self, id: &SegmentId) -> Option<Arc<SegmentFile>> {
        self.files.read().unsorted.get(id).cloned()
    }

    /// Returns the sorted file of `id`, if any.
    #[must_use]
    pub fn get_sorted(&self, id: &SegmentId) -> Option<Arc<SegmentFile>> {
        self.files.read().sorted.get(id).cloned()
    }

    /// Number of segments with an unsorted file.
    #[must_use]
    pub fn unsorted_count(&self) -> usize {
        self.files.read().unsorted.len()
    }

    /// Number of segments with a sorted file.
    #[must_use]
    pub fn sorted_count(&self) -> usize {
        self.files.read().sorted.len()
    }

    /// Ids of all unsorted segments, in order.
    #[must_use]
    pub fn unsorted_ids(&self) -> Vec<SegmentId> {
        sorted_keys(&self.files.read().unsorted)
    }

    /// Ids of all sorted segments, in order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<SegmentId> {
        sorted_keys(&self.files.read().sorted)
    }

    /// Diagnostic dump of the directory, mode and every tracked segment.
    #[must_use]
    pub fn describe(&self) -> String {
        self.describe_files(&self.files.read())
    }

    fn describe_files(&self, files: &Files) -> String {
        let mut s = format!(
            "<SegmentFileRegistry:{}>[mock={}]: unsorted[{}], sorted[{}]",
            self.dir.display(),
            self.mock,
            files.unsorted.len(),
            files.sorted.len()
        );
        for (label, map) in [("unsorted", &files.unsorted), ("sorted", &files.sorted)] {
            if map.is_empty() {
                continue;
            }
            s.push_str("\n  ");
            s.push_str(label);
            s.push(':');
            for id in sorted_keys(map) {
                s.push(' ');
                s.push_str(&id.to_string());
            }
        }
        s
    }

    /// Closes every tracked file and empties both maps.
    ///
    /// Every file is closed even if an earlier one fails.
    ///
    /// # Panics
    ///
    /// Under [`InvariantPolicy::Panic`], panics if any close fails. Under
    /// [`InvariantPolicy::Propagate`] the first failure is returned as
    /// [`CoreError::InvariantViolation`].
    pub fn close_all(&self) -> CoreResult<()> {
        let mut files = self.files.write();
        let before = self.describe_files(&files);
        let unsorted = std::mem::take(&mut files.unsorted);
        let sorted = std::mem::take(&mut files.sorted);
        let total = unsorted.len() + sorted.len();

        let mut first_failure = None;
        for (id, file) in unsorted.into_iter().chain(sorted) {
            if let Err(err) = file.close() {
                error!(segment = %id, %err, "failed to close segment file");
                first_failure.get_or_insert((id, err));
            }
        }

        if let Some((id, err)) = first_failure {
            error!(registry = %before, "registry contents before close_all");
            return Err(self.violation(&files, "close_all", &id, format!("close failed: {err}")));
        }
        info!(dir = %self.dir.display(), files = total, "closed all segment files");
        Ok(())
    }

    /// Logs an invariant violation with the registry contents, then applies
    /// the policy.
    fn violation(
        &self,
        files: &Files,
        operation: &'static str,
        id: &SegmentId,
        message: impl Into<String>,
    ) -> CoreError {
        let err = CoreError::invariant_violation(operation, id, message);
        error!(
            registry = %self.describe_files(files),
            segment = %id,
            operation,
            "{err}"
        );
        match self.policy {
            InvariantPolicy::Panic => panic!("{err}"),
            InvariantPolicy::Propagate => err,
        }
    }
}

impl fmt::Display for SegmentFileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl fmt::Debug for SegmentFileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files = self.files.read();
        f.debug_struct("SegmentFileRegistry")
            .field("dir", &self.dir)
            .field("mock", &self.mock)
            .field("policy", &self.policy)
            .field("unsorted", &files.unsorted.len())
            .field("sorted", &files.sorted.len())
            .finish()
    }
}

fn sorted_keys(map: &HashMap<SegmentId, Arc<SegmentFile>>) -> Vec<SegmentId> {
    let mut ids: Vec<SegmentId> = map.keys().cloned().collect();
    ids.sort();
    ids
}
