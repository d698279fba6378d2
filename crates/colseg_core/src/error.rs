//! Error types for colseg core.

use crate::segment::{FileType, SegmentId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in segment registry and directory operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] colseg_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The segment is already tracked by the registry.
    #[error("duplicate {file_type} segment: {id}")]
    DuplicateSegment {
        /// The segment that was already registered.
        id: SegmentId,
        /// The file type the caller tried to register.
        file_type: FileType,
    },

    /// The registry's bookkeeping disagrees with the caller's.
    ///
    /// This is never retryable. An embedder that receives it must stop
    /// using the registry.
    #[error("invariant violation in {operation} for segment {id}: {message}")]
    InvariantViolation {
        /// The registry operation that detected the violation.
        operation: &'static str,
        /// The segment involved.
        id: SegmentId,
        /// What was wrong.
        message: String,
    },

    /// Another holder has the storage directory locked.
    #[error("directory locked: another process has exclusive access to {}", .path.display())]
    DirectoryLocked {
        /// The directory that is locked.
        path: PathBuf,
    },

    /// A file name does not follow the segment naming scheme.
    #[error("invalid segment name: {name}")]
    InvalidSegmentName {
        /// The offending name.
        name: String,
    },

    /// Invalid storage directory.
    #[error("invalid directory: {message}")]
    InvalidDirectory {
        /// Description of the problem.
        message: String,
    },

    /// The segment file has been closed.
    #[error("segment file closed: {id}")]
    SegmentClosed {
        /// The closed segment.
        id: SegmentId,
    },

    /// The sorted segment file is sealed and cannot be written.
    #[error("segment file sealed: {id}")]
    SegmentSealed {
        /// The sealed segment.
        id: SegmentId,
    },

    /// Operation not permitted on this kind of segment file.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a duplicate segment error.
    pub fn duplicate(id: &SegmentId, file_type: FileType) -> Self {
        Self::DuplicateSegment {
            id: id.clone(),
            file_type,
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant_violation(
        operation: &'static str,
        id: &SegmentId,
        message: impl Into<String>,
    ) -> Self {
        Self::InvariantViolation {
            operation,
            id: id.clone(),
            message: message.into(),
        }
    }

    /// Creates an invalid segment name error.
    pub fn invalid_segment_name(name: impl Into<String>) -> Self {
        Self::InvalidSegmentName { name: name.into() }
    }

    /// Creates an invalid directory error.
    pub fn invalid_directory(message: impl Into<String>) -> Self {
        Self::InvalidDirectory {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns `true` if the error means the engine must stop.
    ///
    /// Fatal errors must never be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariant_violations_are_fatal() {
        let id = SegmentId::new(1, 0, "a", 7);

        assert!(CoreError::invariant_violation("upgrade", &id, "not registered").is_fatal());
        assert!(!CoreError::duplicate(&id, FileType::Unsorted).is_fatal());
        assert!(!CoreError::SegmentClosed { id }.is_fatal());
    }

    #[test]
    fn messages_name_the_segment() {
        let id = SegmentId::new(1, 0, "a", 7);

        let err = CoreError::duplicate(&id, FileType::Sorted);
        assert_eq!(err.to_string(), "duplicate sorted segment: 1_0_a_7");

        let err = CoreError::invariant_violation("upgrade", &id, "already sorted");
        assert_eq!(
            err.to_string(),
            "invariant violation in upgrade for segment 1_0_a_7: already sorted"
        );
    }
}
