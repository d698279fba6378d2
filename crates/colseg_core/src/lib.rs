//! # colseg core
//!
//! The segment file layer of a columnar storage engine.
//!
//! This crate provides:
//! - [`SegmentId`] and the [`SegmentFile`] variants (unsorted, sorted, mock)
//! - [`SegmentFileRegistry`], which tracks the authoritative file of every
//!   segment and performs the unsorted → sorted upgrade
//! - [`DirLock`], which keeps a second engine out of a storage directory
//! - [`SegmentStore`], which opens both together

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod dir;
mod error;
mod registry;
pub mod segment;
mod store;

pub use config::{Config, InvariantPolicy};
pub use dir::{scan_segment_files, DirLock, SegmentFileEntry, LOCK_NAME};
pub use error::{CoreError, CoreResult};
pub use registry::SegmentFileRegistry;
pub use segment::{
    FileType, MockSegmentFile, SegmentFile, SegmentFileOps, SegmentId, SortedSegmentFile,
    UnsortedSegmentFile,
};
pub use store::{ensure_unlocked, SegmentStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
