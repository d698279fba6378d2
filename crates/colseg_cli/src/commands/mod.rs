//! CLI command implementations.

pub mod ls;
pub mod status;
