//! Status command implementation.

use colseg_core::{dir::lock_file_path, DirLock};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Lock status of a storage directory.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Storage directory.
    pub path: String,
    /// Lock sentinel path.
    pub lock_file: String,
    /// Whether an engine currently holds the lock.
    pub locked: bool,
}

/// Probes the directory lock by taking and releasing it.
///
/// See [`DirLock::is_locked`] for the window in which a concurrent open fails.
pub fn check(path: &Path) -> Result<StatusResult, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No storage directory at {:?}", path).into());
    }

    let lock_file = lock_file_path(path);
    debug!(lock = %lock_file.display(), "probing directory lock");
    Ok(StatusResult {
        path: path.display().to_string(),
        lock_file: lock_file.display().to_string(),
        locked: DirLock::is_locked(path)?,
    })
}

/// Runs the status command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = check(path)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            let state = if result.locked { "locked" } else { "unlocked" };
            println!("{}: {state} ({})", result.path, result.lock_file);
        }
    }
    Ok(())
}
