//! Metadata snapshots of a directory tree

use dirmirror_types::{Error, FileRecord, RelativePath, Result, TimestampSource};
use std::collections::BTreeMap;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Point-in-time mapping of relative paths to file metadata for one root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    root: PathBuf,
    records: BTreeMap<RelativePath, FileRecord>,
}

impl Snapshot {
    /// Create an empty snapshot of `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            records: BTreeMap::new(),
        }
    }

    /// Build a snapshot from already captured records
    pub fn from_records(
        root: impl Into<PathBuf>,
        records: impl IntoIterator<Item = FileRecord>,
    ) -> Self {
        let mut snapshot = Self::new(root);
        for record in records {
            snapshot.insert(record);
        }
        snapshot
    }

    /// Insert a record, replacing any previous record for the same path
    pub fn insert(&mut self, record: FileRecord) {
        self.records.insert(record.relative_path.clone(), record);
    }

    /// Root directory this snapshot describes
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up the record of a relative path
    pub fn get(&self, path: &RelativePath) -> Option<&FileRecord> {
        self.records.get(path)
    }

    /// Whether the snapshot contains `path`
    pub fn contains(&self, path: &RelativePath) -> bool {
        self.records.contains_key(path)
    }

    /// Relative paths in lexical order
    pub fn paths(&self) -> impl Iterator<Item = &RelativePath> {
        self.records.keys()
    }

    /// Records in lexical path order
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no file was found
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of all file sizes
    pub fn total_bytes(&self) -> u64 {
        self.records.values().map(|record| record.size).sum()
    }
}

/// Walks a directory tree and captures a [`Snapshot`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotBuilder {
    timestamp_source: TimestampSource,
}

impl SnapshotBuilder {
    /// Create a builder reading the given timestamp as creation time
    pub fn new(timestamp_source: TimestampSource) -> Self {
        Self { timestamp_source }
    }

    /// Timestamp used as creation time
    pub fn timestamp_source(&self) -> TimestampSource {
        self.timestamp_source
    }

    /// Snapshot every regular file below `root`
    ///
    /// Fails when `root` itself cannot be read. Entries that vanish during the walk are
    /// skipped silently; other unreadable entries are skipped with a warning.
    pub fn build(&self, root: &Path) -> Result<Snapshot> {
        let root_metadata = std::fs::metadata(root).map_err(|e| Error::from_io(&e, root))?;
        if !root_metadata.is_dir() {
            return Err(Error::Io {
                message: format!("Snapshot root is not a directory: {}", root.display()),
            });
        }
        std::fs::read_dir(root).map_err(|e| Error::from_io(&e, root))?;

        let mut snapshot = Snapshot::new(root);
        let walker = WalkDir::new(root).min_depth(1).follow_links(false);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err.io_error().map(std::io::Error::kind) == Some(ErrorKind::NotFound) {
                        debug!("Entry vanished during walk: {}", err);
                    } else {
                        warn!("Skipping unreadable entry: {}", err);
                    }
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(relative_path) = RelativePath::from_root(root, entry.path()) else {
                warn!(
                    "Skipping file with a non UTF-8 name: {}",
                    entry.path().display()
                );
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    if err.io_error().map(std::io::Error::kind) == Some(ErrorKind::NotFound) {
                        debug!("File vanished before stat: {}", entry.path().display());
                    } else {
                        warn!("Failed to stat '{}': {}", entry.path().display(), err);
                    }
                    continue;
                }
            };

            let creation_time = self.creation_time(&metadata);
            snapshot.insert(FileRecord::new(relative_path, creation_time, metadata.len()));
        }

        info!(
            "Snapshot of '{}': {} files, {} bytes",
            root.display(),
            snapshot.len(),
            snapshot.total_bytes()
        );
        Ok(snapshot)
    }

    /// Snapshot `root` on the blocking thread pool
    pub async fn build_async(&self, root: &Path) -> Result<Snapshot> {
        let builder = *self;
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || builder.build(&root))
            .await
            .map_err(|e| Error::sync(format!("Snapshot task failed: {}", e)))?
    }

    fn creation_time(&self, metadata: &Metadata) -> SystemTime {
        let stamp = match self.timestamp_source {
            TimestampSource::Created => metadata.created().or_else(|_| metadata.modified()),
            TimestampSource::Modified => metadata.modified(),
        };
        stamp.unwrap_or(SystemTime::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_records_relative_posix_paths() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("docs/nested")).unwrap();
        fs::write(temp_dir.path().join("top.txt"), b"0123456789").unwrap();
        fs::write(temp_dir.path().join("docs/nested/deep.bin"), vec![7u8; 64]).unwrap();

        let snapshot = SnapshotBuilder::new(TimestampSource::Modified)
            .build(temp_dir.path())
            .unwrap();

        let paths: Vec<&str> = snapshot.paths().map(RelativePath::as_str).collect();
        assert_eq!(paths, vec!["docs/nested/deep.bin", "top.txt"]);

        let top = snapshot.get(&RelativePath::new("top.txt").unwrap()).unwrap();
        assert_eq!(top.size, 10);
        assert_eq!(snapshot.total_bytes(), 74);
    }

    #[test]
    fn test_snapshot_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("empty/also_empty")).unwrap();

        let snapshot = SnapshotBuilder::default().build(temp_dir.path()).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_snapshot_uses_modification_time() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("stamped.txt");
        fs::write(&file, b"x").unwrap();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        filetime::set_file_mtime(&file, filetime::FileTime::from_system_time(stamp)).unwrap();

        let snapshot = SnapshotBuilder::new(TimestampSource::Modified)
            .build(temp_dir.path())
            .unwrap();
        let record = snapshot
            .get(&RelativePath::new("stamped.txt").unwrap())
            .unwrap();
        assert_eq!(record.creation_time, stamp);
    }

    #[test]
    fn test_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let result = SnapshotBuilder::default().build(&missing);
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }

    #[test]
    fn test_file_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();

        assert!(SnapshotBuilder::default().build(&file).is_err());
    }

    #[tokio::test]
    async fn test_build_async_matches_sync() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"abc").unwrap();

        let builder = SnapshotBuilder::new(TimestampSource::Modified);
        let sync = builder.build(temp_dir.path()).unwrap();
        let async_snapshot = builder.build_async(temp_dir.path()).await.unwrap();
        assert_eq!(sync, async_snapshot);
    }

    #[test]
    fn test_from_records_keys_by_relative_path() {
        let record = FileRecord::new(
            RelativePath::new("a.txt").unwrap(),
            SystemTime::UNIX_EPOCH,
            1,
        );
        let snapshot = Snapshot::from_records("/root", vec![record.clone(), record]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.root(), Path::new("/root"));
    }
}
