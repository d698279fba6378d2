//! Property-based test generators using proptest.
//!
//! Besides value strategies, this module has a small reference model of the
//! registry so random operation sequences can be checked against it.

use colseg_core::{CoreError, FileType, SegmentFileOps, SegmentFileRegistry, SegmentId};
use proptest::prelude::*;
use std::collections::HashMap;

/// Strategy for segment ids with filename-safe tablet names.
pub fn segment_id_strategy() -> impl Strategy<Value = SegmentId> {
    (
        any::<u64>(),
        any::<u64>(),
        prop::string::string_regex("[A-Za-z0-9_-]{1,16}").expect("Invalid regex"),
        any::<u64>(),
    )
        .prop_map(|(table, group, tablet, segment)| SegmentId::new(table, group, tablet, segment))
}

/// Strategy for tablet names the registry must refuse: empty, or holding a
/// path separator, `.` or NUL somewhere.
pub fn unsafe_tablet_strategy() -> impl Strategy<Value = String> {
    let bad = prop::sample::select(vec!["/", "\\", ".", "..", "\0", "../.."]);
    prop_oneof![
        1 => Just(String::new()),
        4 => ("[a-z0-9_]{0,6}", bad, "[a-z0-9_]{0,6}")
            .prop_map(|(prefix, bad, suffix)| format!("{prefix}{bad}{suffix}")),
    ]
}

/// A registry call, addressed by index into a fixed pool of ids.
#[derive(Debug, Clone, Copy)]
pub enum RegistryOp {
    /// `register_unsorted`
    RegisterUnsorted(usize),
    /// `register_sorted`
    RegisterSorted(usize),
    /// `upgrade`
    Upgrade(usize),
}

/// Strategy for operation sequences over a pool of `pool` ids.
pub fn registry_ops_strategy(pool: usize, max_len: usize) -> impl Strategy<Value = Vec<RegistryOp>> {
    let op = prop_oneof![
        3 => (0..pool).prop_map(RegistryOp::RegisterUnsorted),
        1 => (0..pool).prop_map(RegistryOp::RegisterSorted),
        2 => (0..pool).prop_map(RegistryOp::Upgrade),
    ];
    prop::collection::vec(op, 0..max_len)
}

/// Expected registry state, one entry per tracked segment.
#[derive(Debug, Default)]
pub struct RegistryModel {
    states: HashMap<SegmentId, FileType>,
}

impl RegistryModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `op` to both the model and `registry`, and checks that the
    /// registry's answer matches the model.
    ///
    /// `registry` must use [`colseg_core::InvariantPolicy::Propagate`].
    pub fn apply(&mut self, registry: &SegmentFileRegistry, ids: &[SegmentId], op: RegistryOp) {
        match op {
            RegistryOp::RegisterUnsorted(i) => {
                let id = &ids[i];
                let result = registry.register_unsorted(id);
                if self.states.contains_key(id) {
                    assert!(matches!(result, Err(CoreError::DuplicateSegment { .. })));
                } else {
                    assert_eq!(result.expect("register_unsorted").file_type(), FileType::Unsorted);
                    self.states.insert(id.clone(), FileType::Unsorted);
                }
            }
            RegistryOp::RegisterSorted(i) => {
                let id = &ids[i];
                let result = registry.register_sorted(id);
                if self.states.contains_key(id) {
                    assert!(matches!(result, Err(CoreError::DuplicateSegment { .. })));
                } else {
                    assert_eq!(result.expect("register_sorted").file_type(), FileType::Sorted);
                    self.states.insert(id.clone(), FileType::Sorted);
                }
            }
            RegistryOp::Upgrade(i) => {
                let id = &ids[i];
                let result = registry.upgrade(id);
                if self.states.get(id) == Some(&FileType::Unsorted) {
                    assert_eq!(result.expect("upgrade").file_type(), FileType::Sorted);
                    self.states.insert(id.clone(), FileType::Sorted);
                } else {
                    assert!(result.expect_err("upgrade must fail").is_fatal());
                }
            }
        }
    }

    /// Checks every id in `ids` against the registry.
    pub fn verify(&self, registry: &SegmentFileRegistry, ids: &[SegmentId]) {
        for id in ids {
            let unsorted = registry.get_unsorted(id);
            let sorted = registry.get_sorted(id);
            assert!(unsorted.is_none() || sorted.is_none(), "{id} tracked twice");

            match self.states.get(id) {
                Some(FileType::Unsorted) => assert!(unsorted.is_some(), "{id} lost"),
                Some(FileType::Sorted) => assert!(sorted.is_some(), "{id} lost"),
                None => assert!(unsorted.is_none() && sorted.is_none(), "{id} appeared"),
            }
        }

        let expected_unsorted = self
            .states
            .values()
            .filter(|t| **t == FileType::Unsorted)
            .count();
        assert_eq!(registry.unsorted_count(), expected_unsorted);
        assert_eq!(
            registry.sorted_count(),
            self.states.len() - expected_unsorted
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::propagating_mock_registry;

    const POOL: usize = 6;

    fn pool() -> Vec<SegmentId> {
        (0..POOL as u64).map(|n| SegmentId::new(1, 0, "a", n)).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn segment_ids_name_files(id in segment_id_strategy()) {
            let name = id.to_string();
            prop_assert!(!name.contains('/'));
            prop_assert_eq!(name.parse::<SegmentId>().unwrap(), id);
        }

        #[test]
        fn registry_refuses_unsafe_tablets(tablet in unsafe_tablet_strategy()) {
            let dir = tempfile::tempdir().unwrap();
            let data = dir.path().join("data");
            let registry = SegmentFileRegistry::new(&data, false);
            let id = SegmentId::new(1, 0, tablet, 7);

            let rejected = matches!(
                registry.register_unsorted(&id),
                Err(CoreError::InvalidSegmentName { .. })
            );
            prop_assert!(rejected);
            prop_assert!(!data.exists());
            prop_assert_eq!(registry.unsorted_count(), 0);
        }

        #[test]
        fn registry_matches_model(ops in registry_ops_strategy(POOL, 40)) {
            let registry = propagating_mock_registry();
            let ids = pool();
            let mut model = RegistryModel::new();

            for op in ops {
                model.apply(&registry, &ids, op);
                model.verify(&registry, &ids);
            }

            registry.close_all().unwrap();
            prop_assert_eq!(registry.unsorted_count() + registry.sorted_count(), 0);
        }
    }
}
