//! Core data types for dirmirror
//!
//! Relative paths, captured file records, and the per-phase statistics shared by the
//! snapshot builder, the diff engine and the reconciliation driver.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Unique identifier for a sync run
pub type RunId = uuid::Uuid;

/// File size in bytes
pub type FileSize = u64;

/// Root-relative file path using `/` as separator on every platform
///
/// The string form is both the snapshot key and the suffix of the remote object path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct RelativePath(String);

impl RelativePath {
    /// Build from a `/`-separated string, dropping empty and `.` segments
    ///
    /// Returns `None` when nothing is left or a segment is `..`.
    pub fn new(path: impl AsRef<str>) -> Option<Self> {
        let mut segments = Vec::new();
        for segment in path.as_ref().split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => return None,
                other => segments.push(other),
            }
        }
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments.join("/")))
        }
    }

    /// Strip `root` from `path` and normalize what remains
    ///
    /// Returns `None` if `path` is not below `root`, or a component is not valid UTF-8.
    pub fn from_root(root: &Path, path: &Path) -> Option<Self> {
        let relative = path.strip_prefix(root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => segments.push(name.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments.join("/")))
        }
    }

    /// The `/`-separated form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters, used to order the purge phase
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Resolve against a local root using native separators
    pub fn to_native(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(self.0.split('/'));
        path
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which filesystem timestamp stands in for the file's creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum TimestampSource {
    /// Platform birth time (writable only on Windows)
    Created,
    /// Last modification time, preserved on every platform
    Modified,
}

impl Default for TimestampSource {
    fn default() -> Self {
        if cfg!(windows) {
            Self::Created
        } else {
            Self::Modified
        }
    }
}

/// Metadata captured for one regular file during a snapshot walk
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileRecord {
    /// Path relative to the snapshot root
    pub relative_path: RelativePath,
    /// Creation timestamp (see [`TimestampSource`])
    pub creation_time: SystemTime,
    /// File size in bytes
    pub size: FileSize,
}

impl FileRecord {
    /// Create a new file record
    pub fn new(relative_path: RelativePath, creation_time: SystemTime, size: FileSize) -> Self {
        Self {
            relative_path,
            creation_time,
            size,
        }
    }

    /// Absolute distance between the two creation times
    pub fn creation_time_delta(&self, other: &Self) -> Duration {
        match self.creation_time.duration_since(other.creation_time) {
            Ok(delta) => delta,
            Err(err) => err.duration(),
        }
    }
}

/// Phase of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SyncPhase {
    /// Overwrite target files whose metadata diverges from the reference
    Modify,
    /// Copy reference-only files into the target
    AddToTarget,
    /// Delete target-only files
    PurgeFromTarget,
}

impl SyncPhase {
    /// All phases in execution order
    pub const ORDER: [SyncPhase; 3] = [Self::Modify, Self::AddToTarget, Self::PurgeFromTarget];
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Modify => "modify",
            Self::AddToTarget => "add-to-target",
            Self::PurgeFromTarget => "purge-from-target",
        };
        f.write_str(name)
    }
}

/// Step of a single item that can fail independently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SyncStep {
    /// Copy or overwrite in the target tree
    LocalCopy,
    /// Delete from the target tree
    LocalDelete,
    /// Upload through the storage client
    RemoteUpload,
    /// Remove through the storage client
    RemoteRemove,
}

impl SyncStep {
    /// Whether the step talks to the remote store
    pub fn is_remote(self) -> bool {
        matches!(self, Self::RemoteUpload | Self::RemoteRemove)
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LocalCopy => "local copy",
            Self::LocalDelete => "local delete",
            Self::RemoteUpload => "remote upload",
            Self::RemoteRemove => "remote remove",
        };
        f.write_str(name)
    }
}

/// Counters for one reconciliation phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseStats {
    /// Items the diff scheduled for this phase
    pub planned: u64,
    /// Items whose local step succeeded
    pub applied: u64,
    /// Items whose remote step(s) all succeeded
    pub mirrored: u64,
    /// Items skipped or failed at the local step
    pub local_failures: u64,
    /// Items whose remote step failed
    pub remote_failures: u64,
    /// Bytes written into the target tree
    pub bytes_copied: u64,
}

impl PhaseStats {
    /// Create counters for `planned` items
    pub fn planned(planned: u64) -> Self {
        Self {
            planned,
            ..Self::default()
        }
    }

    /// Total failed steps, local and remote
    pub fn failures(&self) -> u64 {
        self.local_failures + self.remote_failures
    }

    /// Merge counters from another instance
    pub fn merge(&mut self, other: &PhaseStats) {
        self.planned += other.planned;
        self.applied += other.applied;
        self.mirrored += other.mirrored;
        self.local_failures += other.local_failures;
        self.remote_failures += other.remote_failures;
        self.bytes_copied += other.bytes_copied;
    }
}
