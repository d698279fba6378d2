//! Cross-crate integration test helpers.
//!
//! [`LifecycleHarness`] drives segments through flush and compaction the way
//! the engine does, and remembers what each segment should contain.

use colseg_core::{CoreResult, SegmentFileOps, SegmentFileRegistry, SegmentId};
use std::collections::HashMap;

/// Flushes and compacts segments on a registry, tracking expected contents.
pub struct LifecycleHarness<'a> {
    registry: &'a SegmentFileRegistry,
    expected: HashMap<SegmentId, Vec<u8>>,
}

impl<'a> LifecycleHarness<'a> {
    /// Creates a harness over `registry`.
    pub fn new(registry: &'a SegmentFileRegistry) -> Self {
        Self {
            registry,
            expected: HashMap::new(),
        }
    }

    /// Registers `id` and writes `rows` to its unsorted file.
    pub fn flush(&mut self, id: &SegmentId, rows: &[u8]) -> CoreResult<()> {
        let file = self.registry.register_unsorted(id)?;
        file.append(rows)?;
        file.sync()?;
        self.expected.insert(id.clone(), rows.to_vec());
        Ok(())
    }

    /// Reads the unsorted rows, upgrades `id`, and writes them back sorted.
    pub fn compact(&mut self, id: &SegmentId) -> CoreResult<()> {
        let unsorted = self
            .registry
            .get_unsorted(id)
            .ok_or_else(|| colseg_core::CoreError::invalid_operation(format!("{id} not flushed")))?;
        let mut rows = unsorted.read_at(0, unsorted.size()? as usize)?;
        rows.sort_unstable();

        let sorted = self.registry.upgrade(id)?;
        sorted.append(&rows)?;
        sorted.seal()?;
        self.expected.insert(id.clone(), rows);
        Ok(())
    }

    /// Checks that every tracked segment reads back what was written.
    pub fn verify(&self) {
        for (id, rows) in &self.expected {
            let file = self
                .registry
                .get_sorted(id)
                .or_else(|| self.registry.get_unsorted(id))
                .unwrap_or_else(|| panic!("{id} not tracked"));
            let actual = file.read_at(0, rows.len()).expect("read segment");
            assert_eq!(&actual, rows, "contents mismatch for {id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{mock_registry, segment, TestStore};
    use colseg_core::{
        scan_segment_files, Config, CoreError, DirLock, FileType, SegmentStore,
    };

    #[test]
    fn flush_and_compact_on_disk() {
        let store = TestStore::new();
        let mut harness = LifecycleHarness::new(store.files());

        harness.flush(&segment(1, 1), b"dcba").unwrap();
        harness.flush(&segment(1, 2), b"zyx").unwrap();
        harness.compact(&segment(1, 1)).unwrap();
        harness.verify();

        let sorted = store.files().get_sorted(&segment(1, 1)).unwrap();
        assert_eq!(sorted.read_at(0, 4).unwrap(), b"abcd");
        assert!(sorted.is_sealed());
    }

    #[test]
    fn flush_and_compact_in_mock_mode() {
        let registry = mock_registry();
        let mut harness = LifecycleHarness::new(&registry);

        for n in 0..10 {
            harness.flush(&segment(2, n), &[n as u8, 0xff, 0x01]).unwrap();
        }
        for n in (0..10).step_by(2) {
            harness.compact(&segment(2, n)).unwrap();
        }
        harness.verify();
        assert_eq!(registry.sorted_count(), 5);
        assert_eq!(registry.unsorted_count(), 5);
    }

    #[test]
    fn compacting_unflushed_segment_fails() {
        let registry = mock_registry();
        let mut harness = LifecycleHarness::new(&registry);

        let err = harness.compact(&segment(3, 1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
    }

    #[test]
    fn restart_rebuilds_registry_from_disk() {
        let store = TestStore::new();
        let mut harness = LifecycleHarness::new(store.files());
        harness.flush(&segment(1, 1), b"unsorted").unwrap();
        harness.flush(&segment(1, 2), b"to sort").unwrap();
        harness.compact(&segment(1, 2)).unwrap();
        drop(harness);
        let dir = store.close();

        let reopened = SegmentStore::open(dir.path(), Config::default()).unwrap();
        let found = scan_segment_files(dir.path()).unwrap();
        assert_eq!(found.len(), 3);
        // The compacted segment's stale unsorted file is still on disk; the
        // sorted file wins.
        for entry in &found {
            let has_sorted = found
                .iter()
                .any(|e| e.id == entry.id && e.file_type == FileType::Sorted);
            match entry.file_type {
                FileType::Unsorted if has_sorted => continue,
                FileType::Unsorted => reopened.files().register_unsorted(&entry.id).unwrap(),
                FileType::Sorted => reopened.files().register_sorted(&entry.id).unwrap(),
            };
        }
        assert_eq!(reopened.files().unsorted_count(), 1);
        assert_eq!(reopened.files().sorted_count(), 1);

        let unsorted = reopened.files().get_unsorted(&segment(1, 1)).unwrap();
        assert_eq!(unsorted.read_at(0, 8).unwrap(), b"unsorted");
        let sorted = reopened.files().get_sorted(&segment(1, 2)).unwrap();
        assert_eq!(sorted.read_at(0, 7).unwrap(), b" oorstt");
        reopened.close().unwrap();
    }

    #[test]
    fn upgrade_leaves_stale_file_on_disk_for_cleanup() {
        let store = TestStore::new();
        let mut harness = LifecycleHarness::new(store.files());
        harness.flush(&segment(4, 1), b"rows").unwrap();
        harness.compact(&segment(4, 1)).unwrap();

        let names: Vec<_> = scan_segment_files(store.path())
            .unwrap()
            .into_iter()
            .map(|e| e.file_type)
            .collect();
        assert_eq!(names, [FileType::Unsorted, FileType::Sorted]);
    }

    #[test]
    fn lock_blocks_second_store_across_threads() {
        let store = TestStore::new();
        let path = store.path().to_path_buf();

        let result = std::thread::spawn(move || DirLock::acquire(&path).map(|_| ()))
            .join()
            .unwrap();
        assert!(matches!(result, Err(CoreError::DirectoryLocked { .. })));

        let dir = store.close();
        let _lock = DirLock::acquire(dir.path()).unwrap();
    }
}
