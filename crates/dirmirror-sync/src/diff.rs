//! Snapshot comparison under the size + creation-time equality rule
//!
//! Two records for the same relative path are equal when their sizes match and their
//! creation times are at most `tolerance` apart. A same-size rewrite inside the tolerance
//! window is therefore reported as unchanged; content is never hashed.

use crate::snapshot::Snapshot;
use dirmirror_config::{DiffSettings, DEFAULT_TIME_TOLERANCE_SECS};
use dirmirror_types::{FileRecord, RelativePath};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Why a path present on both sides was classified as modified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationReason {
    /// Creation times are further apart than the tolerance
    CreationTimeDiffers,
    /// Sizes differ
    SizeDiffers,
}

impl fmt::Display for ModificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreationTimeDiffers => f.write_str("creation time differs"),
            Self::SizeDiffers => f.write_str("size differs"),
        }
    }
}

/// A path present on both sides whose metadata diverges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedEntry {
    /// Relative path
    pub path: RelativePath,
    /// Every failed condition, in rule order
    pub reasons: Vec<ModificationReason>,
    /// Record on the reference side
    pub reference: FileRecord,
    /// Record on the target side
    pub target: FileRecord,
}

impl ModifiedEntry {
    /// Reasons rendered as `(creation time differs, size differs)`
    pub fn details(&self) -> String {
        let reasons: Vec<String> = self.reasons.iter().map(ToString::to_string).collect();
        format!("({})", reasons.join(", "))
    }
}

/// Classification of two snapshots
///
/// `added` and `deleted` are named from the target's point of view: `added` holds the
/// target-only paths (to purge), `deleted` the reference-only paths (to copy over).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// In the target, absent from the reference
    pub added: Vec<RelativePath>,
    /// In the reference, absent from the target
    pub deleted: Vec<RelativePath>,
    /// In both, equality rule fails
    pub modified: Vec<ModifiedEntry>,
}

impl ChangeSet {
    /// Whether the two trees already match
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }

    /// Total number of classified paths
    pub fn len(&self) -> usize {
        self.added.len() + self.deleted.len() + self.modified.len()
    }

    /// Target-only paths ordered for deletion: longest first, ties in lexical order
    pub fn purge_order(&self) -> Vec<RelativePath> {
        let mut ordered = self.added.clone();
        ordered.sort_by(|a, b| b.char_len().cmp(&a.char_len()).then_with(|| a.cmp(b)));
        ordered
    }

    /// Files that will be written into the target (copied plus overwritten)
    pub fn copy_count(&self) -> usize {
        self.deleted.len() + self.modified.len()
    }
}

/// Configuration for difference detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffConfig {
    /// Maximum creation-time distance still considered equal (inclusive)
    pub time_tolerance: Duration,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            time_tolerance: Duration::from_secs_f64(DEFAULT_TIME_TOLERANCE_SECS),
        }
    }
}

impl From<&DiffSettings> for DiffConfig {
    fn from(settings: &DiffSettings) -> Self {
        Self {
            time_tolerance: settings.tolerance(),
        }
    }
}

/// Engine comparing a reference snapshot with a target snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine {
    config: DiffConfig,
}

impl DiffEngine {
    /// Create a new diff engine
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    /// Create an engine with the given tolerance
    pub fn with_tolerance(time_tolerance: Duration) -> Self {
        Self::new(DiffConfig { time_tolerance })
    }

    /// Tolerance in use
    pub fn tolerance(&self) -> Duration {
        self.config.time_tolerance
    }

    /// Failed equality conditions between two records of the same path
    pub fn compare_records(
        &self,
        reference: &FileRecord,
        target: &FileRecord,
    ) -> Vec<ModificationReason> {
        let mut reasons = Vec::new();
        if target.creation_time_delta(reference) > self.config.time_tolerance {
            reasons.push(ModificationReason::CreationTimeDiffers);
        }
        if target.size != reference.size {
            reasons.push(ModificationReason::SizeDiffers);
        }
        reasons
    }

    /// Classify every path of both snapshots
    pub fn compare(&self, reference: &Snapshot, target: &Snapshot) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for target_record in target.records() {
            let path = &target_record.relative_path;
            match reference.get(path) {
                None => changes.added.push(path.clone()),
                Some(reference_record) => {
                    let reasons = self.compare_records(reference_record, target_record);
                    if !reasons.is_empty() {
                        changes.modified.push(ModifiedEntry {
                            path: path.clone(),
                            reasons,
                            reference: reference_record.clone(),
                            target: target_record.clone(),
                        });
                    }
                }
            }
        }

        changes.deleted = reference
            .paths()
            .filter(|path| !target.contains(path))
            .cloned()
            .collect();

        info!(
            "Comparison done: {} extra in target, {} missing from target, {} to update",
            changes.added.len(),
            changes.deleted.len(),
            changes.modified.len()
        );
        changes
    }
}

/// Compare two snapshots with an explicit tolerance
pub fn diff(reference: &Snapshot, target: &Snapshot, time_tolerance: Duration) -> ChangeSet {
    DiffEngine::with_tolerance(time_tolerance).compare(reference, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::collections::BTreeSet;
    use std::time::SystemTime;

    fn at(millis: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000) + Duration::from_millis(millis)
    }

    fn record(path: &str, millis: u64, size: u64) -> FileRecord {
        FileRecord::new(RelativePath::new(path).unwrap(), at(millis), size)
    }

    fn snapshot(root: &str, records: Vec<FileRecord>) -> Snapshot {
        Snapshot::from_records(root, records)
    }

    #[rstest]
    #[case::identical(0, 10, vec![])]
    #[case::inside_tolerance(1_000, 10, vec![])]
    #[case::at_boundary(2_500, 10, vec![])]
    #[case::past_boundary(2_501, 10, vec![ModificationReason::CreationTimeDiffers])]
    #[case::size_only(0, 11, vec![ModificationReason::SizeDiffers])]
    #[case::both(60_000, 11, vec![ModificationReason::CreationTimeDiffers, ModificationReason::SizeDiffers])]
    fn test_equality_rule(
        #[case] offset_millis: u64,
        #[case] target_size: u64,
        #[case] expected: Vec<ModificationReason>,
    ) {
        let engine = DiffEngine::default();
        let reference = record("f.txt", 0, 10);
        let target = record("f.txt", offset_millis, target_size);

        assert_eq!(engine.compare_records(&reference, &target), expected);
    }

    #[test]
    fn test_tolerance_applies_in_both_directions() {
        let engine = DiffEngine::default();
        let earlier = record("f.txt", 0, 10);
        let later = record("f.txt", 2_500, 10);

        assert!(engine.compare_records(&later, &earlier).is_empty());
        assert!(engine.compare_records(&earlier, &later).is_empty());
    }

    #[test]
    fn test_reference_only_file_is_deleted() {
        let reference = snapshot("/a", vec![record("a.txt", 0, 10)]);
        let target = snapshot("/b", vec![]);

        let changes = DiffEngine::default().compare(&reference, &target);
        assert_eq!(changes.deleted, vec![RelativePath::new("a.txt").unwrap()]);
        assert!(changes.added.is_empty());
        assert!(changes.modified.is_empty());
    }

    #[test]
    fn test_target_only_file_is_added() {
        let reference = snapshot("/a", vec![]);
        let target = snapshot("/b", vec![record("b.txt", 0, 3)]);

        let changes = DiffEngine::default().compare(&reference, &target);
        assert_eq!(changes.added, vec![RelativePath::new("b.txt").unwrap()]);
        assert!(changes.deleted.is_empty());
        assert!(changes.modified.is_empty());
    }

    #[test]
    fn test_size_divergence_is_modified() {
        let reference = snapshot("/a", vec![record("c.txt", 0, 100)]);
        let target = snapshot("/b", vec![record("c.txt", 0, 101)]);

        let changes = DiffEngine::default().compare(&reference, &target);
        assert_eq!(changes.modified.len(), 1);
        let entry = &changes.modified[0];
        assert_eq!(entry.path.as_str(), "c.txt");
        assert_eq!(entry.reasons, vec![ModificationReason::SizeDiffers]);
        assert_eq!(entry.details(), "(size differs)");
        assert_eq!(entry.reference.size, 100);
        assert_eq!(entry.target.size, 101);
    }

    #[test]
    fn test_details_lists_every_reason() {
        let reference = snapshot("/a", vec![record("c.txt", 0, 100)]);
        let target = snapshot("/b", vec![record("c.txt", 10_000, 1)]);

        let changes = diff(&reference, &target, Duration::from_millis(2_500));
        assert_eq!(
            changes.modified[0].details(),
            "(creation time differs, size differs)"
        );
    }

    #[test]
    fn test_purge_order_longest_first() {
        let changes = ChangeSet {
            added: vec![
                RelativePath::new("dir").unwrap(),
                RelativePath::new("b.txt").unwrap(),
                RelativePath::new("dir/file.txt").unwrap(),
                RelativePath::new("a.txt").unwrap(),
            ],
            ..ChangeSet::default()
        };

        let purge = changes.purge_order();
        let ordered: Vec<&str> = purge.iter().map(RelativePath::as_str).collect();
        assert_eq!(ordered, vec!["dir/file.txt", "a.txt", "b.txt", "dir"]);
    }

    #[test]
    fn test_zero_tolerance_requires_exact_time() {
        let reference = snapshot("/a", vec![record("f", 0, 1)]);
        let target = snapshot("/b", vec![record("f", 1, 1)]);

        let changes = diff(&reference, &target, Duration::ZERO);
        assert_eq!(changes.modified.len(), 1);
    }

    fn arb_side() -> impl Strategy<Value = Vec<(u8, u16, u8)>> {
        prop::collection::vec((0u8..24, 0u16..6_000, 0u8..4), 0..24)
    }

    fn build(root: &str, entries: &[(u8, u16, u8)]) -> Snapshot {
        Snapshot::from_records(
            root,
            entries.iter().map(|(name, millis, size)| {
                record(
                    &format!("d{}/f{}", name % 3, name),
                    u64::from(*millis),
                    u64::from(*size),
                )
            }),
        )
    }

    proptest! {
        #[test]
        fn prop_classification_is_a_partition(reference in arb_side(), target in arb_side()) {
            let reference = build("/a", &reference);
            let target = build("/b", &target);
            let engine = DiffEngine::default();
            let changes = engine.compare(&reference, &target);

            let added: BTreeSet<_> = changes.added.iter().cloned().collect();
            let deleted: BTreeSet<_> = changes.deleted.iter().cloned().collect();
            let modified: BTreeSet<_> = changes.modified.iter().map(|m| m.path.clone()).collect();

            prop_assert_eq!(added.len(), changes.added.len());
            prop_assert_eq!(deleted.len(), changes.deleted.len());
            prop_assert_eq!(modified.len(), changes.modified.len());
            prop_assert!(added.is_disjoint(&deleted));
            prop_assert!(added.is_disjoint(&modified));
            prop_assert!(deleted.is_disjoint(&modified));

            let union: BTreeSet<_> = reference.paths().chain(target.paths()).cloned().collect();
            let unchanged: BTreeSet<_> = union
                .iter()
                .filter(|path| {
                    reference.get(path).zip(target.get(path)).is_some_and(|(r, t)| {
                        engine.compare_records(r, t).is_empty()
                    })
                })
                .cloned()
                .collect();

            prop_assert!(unchanged.is_disjoint(&modified));
            let mut classified: BTreeSet<_> = added.union(&deleted).cloned().collect();
            classified.extend(modified.iter().cloned());
            classified.extend(unchanged.iter().cloned());
            prop_assert_eq!(classified, union);
        }

        #[test]
        fn prop_comparing_a_snapshot_with_itself_is_empty(side in arb_side()) {
            let snapshot = build("/a", &side);
            prop_assert!(DiffEngine::default().compare(&snapshot, &snapshot).is_empty());
        }
    }
}
