//! Shared fixtures for dirmirror tests
//!
//! Scratch directory pairs, an in-memory remote store and an event recorder, so that
//! scenarios can assert on remote calls and audit events instead of parsing log files.

use async_trait::async_trait;
use dirmirror_config::Config;
use dirmirror_types::{
    Error, RelativePath, RemoteReceipt, RemoteStore, Result, SyncEvent, SyncObserver, SyncPhase,
    TimestampSource,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A reference (`a`) and target (`b`) directory inside one temporary directory
pub struct TestTree {
    temp_dir: TempDir,
    reference: PathBuf,
    target: PathBuf,
}

impl TestTree {
    /// Create both roots
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reference = temp_dir.path().join("a");
        let target = temp_dir.path().join("b");
        fs::create_dir_all(&reference).expect("Failed to create reference root");
        fs::create_dir_all(&target).expect("Failed to create target root");
        Self {
            temp_dir,
            reference,
            target,
        }
    }

    /// Create only the reference root; the target path does not exist yet
    pub fn without_target() -> Self {
        let tree = Self::new();
        fs::remove_dir_all(&tree.target).expect("Failed to remove target root");
        tree
    }

    /// Temporary directory holding both roots
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Reference root
    pub fn reference(&self) -> &Path {
        &self.reference
    }

    /// Target root
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Write a file below the reference root
    pub fn write_reference(&self, relative: &str, content: &[u8]) -> PathBuf {
        write_file(&self.reference, relative, content)
    }

    /// Write a file below the target root
    pub fn write_target(&self, relative: &str, content: &[u8]) -> PathBuf {
        write_file(&self.target, relative, content)
    }

    /// Read a file below the target root
    pub fn read_target(&self, relative: &str) -> Option<Vec<u8>> {
        fs::read(self.target.join(relative)).ok()
    }

    /// Configuration pointing at both roots, comparing modification times
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.sync.reference_root = self.reference.clone();
        config.sync.target_root = self.target.clone();
        config.diff.timestamp_source = TimestampSource::Modified;
        config.logging.enable_file_logging = false;
        config
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Fixed point in time used to stamp test files
pub fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

/// Set the modification time of `path` to `base_time() + offset`
pub fn set_mtime(path: &Path, offset: Duration) {
    let stamp = filetime::FileTime::from_system_time(base_time() + offset);
    filetime::set_file_mtime(path, stamp).expect("Failed to set modification time");
}

/// A call received by [`MockRemote`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// Upload of a local file
    Upload {
        /// Local file handed to the client
        local: PathBuf,
        /// Relative path it was uploaded under
        relative: String,
    },
    /// Removal of a remote object
    Remove {
        /// Relative path of the removed object
        relative: String,
    },
}

/// In-memory remote store recording every call
#[derive(Debug, Default)]
pub struct MockRemote {
    calls: Mutex<Vec<RemoteCall>>,
    failing_uploads: HashSet<String>,
    failing_removes: HashSet<String>,
}

impl MockRemote {
    /// Create a remote where every call succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make uploads of `relative` fail
    pub fn fail_upload(mut self, relative: &str) -> Self {
        self.failing_uploads.insert(relative.to_string());
        self
    }

    /// Make removals of `relative` fail
    pub fn fail_remove(mut self, relative: &str) -> Self {
        self.failing_removes.insert(relative.to_string());
        self
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().expect("remote call log poisoned").clone()
    }

    /// Relative paths of the uploads received so far
    pub fn uploads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Upload { relative, .. } => Some(relative),
                RemoteCall::Remove { .. } => None,
            })
            .collect()
    }

    /// Relative paths of the removals received so far
    pub fn removals(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Remove { relative } => Some(relative),
                RemoteCall::Upload { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: RemoteCall) {
        self.calls
            .lock()
            .expect("remote call log poisoned")
            .push(call);
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn upload(&self, local_path: &Path, relative: &RelativePath) -> Result<RemoteReceipt> {
        self.record(RemoteCall::Upload {
            local: local_path.to_path_buf(),
            relative: relative.to_string(),
        });
        if self.failing_uploads.contains(relative.as_str()) {
            return Err(Error::remote("upload", Some(1), "simulated upload failure"));
        }
        Ok(RemoteReceipt {
            command: format!("mock upload {}", relative),
            ..RemoteReceipt::default()
        })
    }

    async fn remove(&self, relative: &RelativePath) -> Result<RemoteReceipt> {
        self.record(RemoteCall::Remove {
            relative: relative.to_string(),
        });
        if self.failing_removes.contains(relative.as_str()) {
            return Err(Error::remote("remove", Some(1), "simulated remove failure"));
        }
        Ok(RemoteReceipt {
            command: format!("mock remove {}", relative),
            ..RemoteReceipt::default()
        })
    }
}

/// Observer keeping every event it receives
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in order
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }

    /// Step names recorded for `path`, in order
    pub fn steps_for(&self, path: &str) -> Vec<&'static str> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                SyncEvent::LocalCopied { path: p, .. } if p.as_str() == path => Some("local_copy"),
                SyncEvent::LocalDeleted { path: p, .. } if p.as_str() == path => {
                    Some("local_delete")
                }
                SyncEvent::RemoteUploaded { path: p, .. } if p.as_str() == path => {
                    Some("remote_upload")
                }
                SyncEvent::RemoteRemoved { path: p, .. } if p.as_str() == path => {
                    Some("remote_remove")
                }
                SyncEvent::StepFailed { path: p, .. } if p.as_str() == path => Some("failed"),
                _ => None,
            })
            .collect()
    }

    /// Paths whose processing finished in `phase`, in order
    pub fn finished_in(&self, phase: SyncPhase) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                SyncEvent::ItemFinished { phase: p, path } if *p == phase => Some(path.to_string()),
                _ => None,
            })
            .collect()
    }
}

impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: &SyncEvent) {
        self.events
            .lock()
            .expect("event log poisoned")
            .push(event.clone());
    }
}
