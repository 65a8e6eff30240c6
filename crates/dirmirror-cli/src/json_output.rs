//! JSON output structures for the dirmirror CLI

use chrono::{DateTime, Utc};
use dirmirror_config::Config;
use dirmirror_sync::{ChangeSet, ModificationReason, ModifiedEntry};
use serde::{Deserialize, Serialize};

/// Change set as printed by `dirmirror diff --json`
#[derive(Debug, Serialize, Deserialize)]
pub struct DiffJson {
    /// Operation metadata
    pub metadata: DiffMetadata,
    /// Target-only paths, to purge (deepest first)
    pub added: Vec<String>,
    /// Reference-only paths, to copy
    pub deleted: Vec<String>,
    /// Paths whose metadata diverges
    pub modified: Vec<ModifiedJson>,
}

/// Diff metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct DiffMetadata {
    /// dirmirror version
    pub version: String,
    /// When the comparison ran
    pub timestamp: DateTime<Utc>,
    /// Reference root
    pub reference_root: String,
    /// Target root
    pub target_root: String,
    /// Creation-time tolerance in seconds
    pub time_tolerance_secs: f64,
}

/// One modified path
#[derive(Debug, Serialize, Deserialize)]
pub struct ModifiedJson {
    /// Relative path
    pub path: String,
    /// Failed equality conditions
    pub reasons: Vec<ModificationReason>,
    /// Size on the reference side
    pub reference_size: u64,
    /// Size on the target side
    pub target_size: u64,
}

impl From<&ModifiedEntry> for ModifiedJson {
    fn from(entry: &ModifiedEntry) -> Self {
        Self {
            path: entry.path.to_string(),
            reasons: entry.reasons.clone(),
            reference_size: entry.reference.size,
            target_size: entry.target.size,
        }
    }
}

impl DiffJson {
    /// Build the JSON view of a change set
    pub fn new(config: &Config, changes: &ChangeSet) -> Self {
        Self {
            metadata: DiffMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: Utc::now(),
                reference_root: config.sync.reference_root.display().to_string(),
                target_root: config.sync.target_root.display().to_string(),
                time_tolerance_secs: config.diff.time_tolerance_secs,
            },
            added: changes
                .purge_order()
                .iter()
                .map(ToString::to_string)
                .collect(),
            deleted: changes.deleted.iter().map(ToString::to_string).collect(),
            modified: changes.modified.iter().map(ModifiedJson::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirmirror_types::{FileRecord, RelativePath};
    use std::time::SystemTime;

    #[test]
    fn test_diff_json_shape() {
        let path = RelativePath::new("c.txt").unwrap();
        let changes = ChangeSet {
            added: vec![
                RelativePath::new("dir").unwrap(),
                RelativePath::new("dir/file.txt").unwrap(),
            ],
            deleted: vec![RelativePath::new("a.txt").unwrap()],
            modified: vec![ModifiedEntry {
                path: path.clone(),
                reasons: vec![ModificationReason::SizeDiffers],
                reference: FileRecord::new(path.clone(), SystemTime::UNIX_EPOCH, 100),
                target: FileRecord::new(path, SystemTime::UNIX_EPOCH, 101),
            }],
        };

        let output = DiffJson::new(&Config::default(), &changes);
        let value = serde_json::to_value(&output).unwrap();

        assert_eq!(value["added"][0], "dir/file.txt");
        assert_eq!(value["deleted"][0], "a.txt");
        assert_eq!(value["modified"][0]["reasons"][0], "size_differs");
        assert_eq!(value["modified"][0]["target_size"], 101);
        assert_eq!(value["metadata"]["time_tolerance_secs"], 2.5);
    }
}
