//! # colseg testkit
//!
//! Test utilities for colseg.
//!
//! This crate provides:
//! - Fixtures for temporary stores and mock registries
//! - Property-based generators for segment ids and registry operations
//! - Stress helpers for concurrent registry access
//! - Cross-crate integration tests
//!
//! ## Usage
//!
//! ```rust
//! use colseg_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     let id = segment(1, 7);
//!     store.files().register_unsorted(&id).unwrap();
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
