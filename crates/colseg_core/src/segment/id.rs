//! Segment identifier.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;

/// Names one logical segment of table data.
///
/// Ordered field by field (table, group, tablet, segment), so sorting a set
/// of ids groups them by table.
///
/// The string form `"{table}_{group}_{tablet}_{segment}"` is stable: it is
/// used in diagnostics and as the stem of segment file names. Tablet names
/// may themselves contain `_`, but must be non-empty and free of path
/// separators, `.` and NUL; see [`SegmentId::try_new`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId {
    table_id: u64,
    group_id: u64,
    tablet_id: String,
    segment_id: u64,
}

impl SegmentId {
    /// Creates a segment id without checking the tablet name.
    ///
    /// The registry rejects ids whose tablet is not a valid file name
    /// component, so prefer [`SegmentId::try_new`] for untrusted input.
    pub fn new(table_id: u64, group_id: u64, tablet_id: impl Into<String>, segment_id: u64) -> Self {
        Self {
            table_id,
            group_id,
            tablet_id: tablet_id.into(),
            segment_id,
        }
    }

    /// Creates a segment id, rejecting tablet names that cannot be part of a
    /// segment file name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSegmentName`] if the tablet is empty or
    /// contains `/`, `\`, `.` or NUL.
    pub fn try_new(
        table_id: u64,
        group_id: u64,
        tablet_id: impl Into<String>,
        segment_id: u64,
    ) -> CoreResult<Self> {
        let id = Self::new(table_id, group_id, tablet_id, segment_id);
        id.validate()?;
        Ok(id)
    }

    /// Checks that the tablet name stays inside one file name component.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSegmentName`] carrying the id's string
    /// form if the tablet is empty or contains `/`, `\`, `.` or NUL.
    pub fn validate(&self) -> CoreResult<()> {
        if is_valid_tablet(&self.tablet_id) {
            Ok(())
        } else {
            Err(CoreError::invalid_segment_name(self.to_string()))
        }
    }

    /// Returns the table id.
    #[inline]
    #[must_use]
    pub const fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Returns the group id.
    #[inline]
    #[must_use]
    pub const fn group_id(&self) -> u64 {
        self.group_id
    }

    /// Returns the tablet name.
    #[inline]
    #[must_use]
    pub fn tablet_id(&self) -> &str {
        &self.tablet_id
    }

    /// Returns the segment number within the tablet.
    #[inline]
    #[must_use]
    pub const fn segment_id(&self) -> u64 {
        self.segment_id
    }
}

fn is_valid_tablet(tablet: &str) -> bool {
    !tablet.is_empty() && !tablet.contains(['/', '\\', '.', '\0'])
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.table_id, self.group_id, self.tablet_id, self.segment_id
        )
    }
}

impl FromStr for SegmentId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let invalid = || CoreError::invalid_segment_name(s);

        let mut head = s.splitn(3, '_');
        let table_id = head.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let group_id = head.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let rest = head.next().ok_or_else(invalid)?;

        let (tablet_id, segment) = rest.rsplit_once('_').ok_or_else(invalid)?;
        let segment_id = segment.parse().map_err(|_| invalid())?;

        Self::try_new(table_id, group_id, tablet_id, segment_id).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_format() {
        let id = SegmentId::new(1, 0, "a", 7);
        assert_eq!(id.to_string(), "1_0_a_7");
    }

    #[test]
    fn parse_tablet_with_underscores() {
        let id: SegmentId = "12_3_shard_east_1_44".parse().unwrap();
        assert_eq!(id.table_id(), 12);
        assert_eq!(id.group_id(), 3);
        assert_eq!(id.tablet_id(), "shard_east_1");
        assert_eq!(id.segment_id(), 44);
    }

    #[test]
    fn parse_rejects_malformed() {
        for name in ["", "1", "1_2", "1_2_a", "x_0_a_1", "1_0__7", "1_0_a_b", "-1_0_a_7"] {
            assert!(
                matches!(
                    name.parse::<SegmentId>(),
                    Err(CoreError::InvalidSegmentName { .. })
                ),
                "{name:?} should not parse"
            );
        }
    }

    #[test]
    fn try_new_rejects_unsafe_tablets() {
        for tablet in ["", "x/../../outside", "..", "a.b", "a\\b", "a\0b", "/abs"] {
            assert!(
                matches!(
                    SegmentId::try_new(1, 0, tablet, 7),
                    Err(CoreError::InvalidSegmentName { .. })
                ),
                "{tablet:?} should be rejected"
            );
        }
        assert!(SegmentId::try_new(1, 0, "shard-east_1", 7).is_ok());
    }

    #[test]
    fn validate_reports_string_form() {
        let err = SegmentId::new(1, 0, "a/b", 7).validate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidSegmentName { ref name } if name == "1_0_a/b_7"
        ));
    }

    #[test]
    fn ordering_groups_by_table() {
        let mut ids = vec![
            SegmentId::new(2, 0, "a", 1),
            SegmentId::new(1, 1, "a", 0),
            SegmentId::new(1, 0, "b", 0),
            SegmentId::new(1, 0, "a", 9),
        ];
        ids.sort();

        let names: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["1_0_a_9", "1_0_b_0", "1_1_a_0", "2_0_a_1"]);
    }

    proptest! {
        #[test]
        fn string_form_parses_back(
            table in any::<u64>(),
            group in any::<u64>(),
            tablet in "[A-Za-z0-9_-]{1,16}",
            segment in any::<u64>(),
        ) {
            let id = SegmentId::try_new(table, group, tablet, segment).unwrap();
            let parsed: SegmentId = id.to_string().parse().unwrap();
            prop_assert_eq!(parsed, id);
        }

        #[test]
        fn unsafe_tablets_never_validate(
            prefix in "[a-z0-9_]{0,6}",
            bad in prop::sample::select(vec!['/', '\\', '.', '\0']),
            suffix in "[a-z0-9_]{0,6}",
        ) {
            let tablet = format!("{prefix}{bad}{suffix}");
            let rejected = matches!(
                SegmentId::try_new(1, 0, tablet, 7),
                Err(CoreError::InvalidSegmentName { .. })
            );
            prop_assert!(rejected);
        }
    }
}
