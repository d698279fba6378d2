//! Test fixtures for stores and registries.

use colseg_core::{Config, InvariantPolicy, SegmentFileRegistry, SegmentId, SegmentStore};
use std::path::Path;
use tempfile::TempDir;

/// A real segment store in a temporary directory.
///
/// The directory outlives the store: [`TestStore::close`] returns it so a
/// test can reopen or inspect it.
pub struct TestStore {
    /// The store instance.
    pub store: SegmentStore,
    temp_dir: TempDir,
}

impl TestStore {
    /// Opens a store in a fresh temporary directory.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Opens a store with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = SegmentStore::open(temp_dir.path(), config).expect("Failed to open store");
        Self { store, temp_dir }
    }

    /// Returns the storage directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Closes the store and hands back the still-existing directory.
    pub fn close(self) -> TempDir {
        self.store.close().expect("Failed to close store");
        self.temp_dir
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = SegmentStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs `f` against a temporary real store, then closes it.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&SegmentStore) -> R,
{
    let store = TestStore::new();
    let result = f(&store.store);
    store.close();
    result
}

/// A mock registry that panics on invariant violations.
pub fn mock_registry() -> SegmentFileRegistry {
    SegmentFileRegistry::new("mock", true)
}

/// A mock registry that returns invariant violations as errors.
pub fn propagating_mock_registry() -> SegmentFileRegistry {
    SegmentFileRegistry::with_config(
        "mock",
        &Config::new()
            .mock(true)
            .invariant_policy(InvariantPolicy::Propagate),
    )
}

/// Shorthand for a segment of table 1, group 0, tablet `"a"`.
pub fn segment(table_id: u64, segment_id: u64) -> SegmentId {
    SegmentId::new(table_id, 0, "a", segment_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use colseg_core::SegmentFileOps;

    #[test]
    fn temp_store_lives_until_closed() {
        let store = TestStore::new();
        let path = store.path().to_path_buf();
        store.files().register_unsorted(&segment(1, 1)).unwrap();

        let dir = store.close();
        assert!(path.join("1_0_a_1.useg").exists());
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn with_temp_store_returns_result() {
        let size = with_temp_store(|store| {
            let file = store.files().register_unsorted(&segment(2, 1)).unwrap();
            file.append(b"rows").unwrap();
            file.size().unwrap()
        });
        assert_eq!(size, 4);
    }

    #[test]
    fn mock_registries() {
        assert!(mock_registry().is_mock());
        assert_eq!(
            propagating_mock_registry().invariant_policy(),
            InvariantPolicy::Propagate
        );
    }
}
