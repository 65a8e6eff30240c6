//! Core traits for dirmirror operations
//!
//! These are the seams between the reconciliation driver and its collaborators: the remote
//! store it mirrors into, the observer it reports to, and the flag it polls for cancellation.

use crate::{RelativePath, Result, RunId, SyncPhase, SyncStep};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "async")]
use async_trait::async_trait;

/// Diagnostics returned by a successful remote call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteReceipt {
    /// Command line (or a description of the call) that was executed
    pub command: String,
    /// Captured standard output
    pub stdout: String,
    /// Wall-clock time spent in the call
    pub elapsed: Duration,
}

/// Remote storage backend that mirrors local changes
///
/// Both operations report failure through [`crate::Error::Remote`]; the caller decides
/// whether the item continues.
#[cfg(feature = "async")]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload `local_path` so that it lands at `relative` below the remote root
    async fn upload(&self, local_path: &Path, relative: &RelativePath) -> Result<RemoteReceipt>;

    /// Remove the object stored at `relative` below the remote root
    async fn remove(&self, relative: &RelativePath) -> Result<RemoteReceipt>;
}

/// Typed audit event emitted by the reconciliation driver
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A run has started
    RunStarted {
        /// Run identifier
        run_id: RunId,
        /// Reference root (A)
        reference: PathBuf,
        /// Target root (B)
        target: PathBuf,
        /// Whether mutations are suppressed
        dry_run: bool,
    },
    /// Both snapshots were compared
    PlanReady {
        /// Target-only paths, to purge
        added: usize,
        /// Reference-only paths, to copy
        deleted: usize,
        /// Paths present on both sides with diverging metadata
        modified: usize,
    },
    /// A phase begins processing its items
    PhaseStarted {
        /// Phase
        phase: SyncPhase,
        /// Number of items scheduled
        items: usize,
    },
    /// A file was copied or overwritten in the target tree
    LocalCopied {
        /// Phase
        phase: SyncPhase,
        /// Relative path
        path: RelativePath,
        /// Bytes written
        bytes: u64,
    },
    /// A file was deleted from the target tree
    LocalDeleted {
        /// Relative path
        path: RelativePath,
        /// The file was already gone
        already_absent: bool,
    },
    /// A file was uploaded to the remote store
    RemoteUploaded {
        /// Phase
        phase: SyncPhase,
        /// Relative path
        path: RelativePath,
    },
    /// An object was removed from the remote store
    RemoteRemoved {
        /// Phase
        phase: SyncPhase,
        /// Relative path
        path: RelativePath,
    },
    /// A step failed; later steps of the same item may have been skipped
    StepFailed {
        /// Phase
        phase: SyncPhase,
        /// Relative path
        path: RelativePath,
        /// Failed step
        step: SyncStep,
        /// Rendered error
        message: String,
    },
    /// Dry run: the item would have been processed
    Planned {
        /// Phase
        phase: SyncPhase,
        /// Relative path
        path: RelativePath,
    },
    /// Processing of one item is over, whatever its outcome
    ItemFinished {
        /// Phase
        phase: SyncPhase,
        /// Relative path
        path: RelativePath,
    },
    /// The run was interrupted between two items
    Interrupted {
        /// Phase that was running
        phase: SyncPhase,
    },
    /// The run is over
    RunFinished {
        /// Run identifier
        run_id: RunId,
        /// Whether the run stopped early
        interrupted: bool,
    },
}

/// Receiver of [`SyncEvent`]s
pub trait SyncObserver: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &SyncEvent);
}

/// Observer that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SyncObserver for NullObserver {
    fn on_event(&self, _event: &SyncEvent) {}
}

/// Trait for operation cancellation
pub trait Cancellable {
    /// Cancel the operation
    fn cancel(&self);

    /// Check if the operation is cancelled
    fn is_cancelled(&self) -> bool;
}

/// Shared flag polled by the driver between items
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag that is not set
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cancellable for CancelFlag {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
