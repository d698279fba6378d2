//! # colseg storage
//!
//! Byte-store backends that segment files are built on.
//!
//! A backend is an **opaque, append-only byte store**. It knows nothing
//! about segment identities, sort state or column block layout; those live
//! in `colseg_core`.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - A single OS file
//! - [`InMemoryBackend`] - A growable buffer, used for mock segment files
//!
//! ## Example
//!
//! ```rust
//! use colseg_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"block-0").unwrap();
//! assert_eq!(backend.read_at(offset, 7).unwrap(), b"block-0");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
