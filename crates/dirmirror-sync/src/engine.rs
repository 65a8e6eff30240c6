//! Reconciliation driver

use crate::{
    apply::{DeleteOutcome, LocalApplier},
    diff::{ChangeSet, DiffConfig, DiffEngine, ModifiedEntry},
    remote::{CommandRemote, NoopRemote},
    snapshot::{Snapshot, SnapshotBuilder},
};
use chrono::{DateTime, Utc};
use dirmirror_config::Config;
use dirmirror_types::{
    CancelFlag, Cancellable, Error, ErrorSeverity, NullObserver, PhaseStats, RelativePath, RemoteStore, Result,
    RunId, SyncEvent, SyncObserver, SyncPhase, SyncStep,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{error, info, warn};

/// Outcome of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Run identifier
    pub run_id: RunId,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Reference root (A)
    pub reference_root: PathBuf,
    /// Target root (B)
    pub target_root: PathBuf,
    /// Target-only paths found by the diff
    pub added: usize,
    /// Reference-only paths found by the diff
    pub deleted: usize,
    /// Paths found modified by the diff
    pub modified: usize,
    /// Counters of the modify phase
    pub modify: PhaseStats,
    /// Counters of the add-to-target phase
    pub add_to_target: PhaseStats,
    /// Counters of the purge-from-target phase
    pub purge_from_target: PhaseStats,
    /// Total run time
    pub duration: Duration,
    /// Mutations were suppressed
    pub dry_run: bool,
    /// The run stopped between two items
    pub interrupted: bool,
}

impl SyncReport {
    fn new(run_id: RunId, reference_root: &Path, target_root: &Path, dry_run: bool) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            reference_root: reference_root.to_path_buf(),
            target_root: target_root.to_path_buf(),
            added: 0,
            deleted: 0,
            modified: 0,
            modify: PhaseStats::default(),
            add_to_target: PhaseStats::default(),
            purge_from_target: PhaseStats::default(),
            duration: Duration::ZERO,
            dry_run,
            interrupted: false,
        }
    }

    /// Counters of one phase
    pub fn phase(&self, phase: SyncPhase) -> &PhaseStats {
        match phase {
            SyncPhase::Modify => &self.modify,
            SyncPhase::AddToTarget => &self.add_to_target,
            SyncPhase::PurgeFromTarget => &self.purge_from_target,
        }
    }

    fn phase_mut(&mut self, phase: SyncPhase) -> &mut PhaseStats {
        match phase {
            SyncPhase::Modify => &mut self.modify,
            SyncPhase::AddToTarget => &mut self.add_to_target,
            SyncPhase::PurgeFromTarget => &mut self.purge_from_target,
        }
    }

    /// Files scheduled to be copied or overwritten into the target
    pub fn copied_into_target(&self) -> usize {
        self.deleted + self.modified
    }

    /// Files scheduled to be removed from the target
    pub fn removed_from_target(&self) -> usize {
        self.added
    }

    /// Both trees matched before the run
    pub fn already_in_sync(&self) -> bool {
        self.added == 0 && self.deleted == 0 && self.modified == 0
    }

    /// Counters summed over all phases
    pub fn totals(&self) -> PhaseStats {
        let mut totals = self.modify;
        totals.merge(&self.add_to_target);
        totals.merge(&self.purge_from_target);
        totals
    }

    /// Failed steps over all phases
    pub fn failures(&self) -> u64 {
        self.totals().failures()
    }

    /// `Err(Error::Cancelled)` when the run stopped before finishing every phase
    pub fn ensure_complete(&self) -> Result<()> {
        if self.interrupted {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Drives one run: snapshot both roots, diff them, then apply the three phases in order
///
/// Items are processed one at a time; each item's local step and remote steps complete
/// before the next item starts. Per-item failures are logged and counted, never raised.
pub struct SyncEngine {
    reference_root: PathBuf,
    target_root: PathBuf,
    create_target: bool,
    snapshot_builder: SnapshotBuilder,
    diff_engine: DiffEngine,
    applier: LocalApplier,
    remote: Arc<dyn RemoteStore>,
    observer: Arc<dyn SyncObserver>,
    cancel: CancelFlag,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("reference_root", &self.reference_root)
            .field("target_root", &self.target_root)
            .field("create_target", &self.create_target)
            .field("snapshot_builder", &self.snapshot_builder)
            .field("diff_engine", &self.diff_engine)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Create an engine from the configuration
    ///
    /// The remote store is the command-line client, or a no-op store when `remote.enabled`
    /// is false.
    pub fn new(config: &Config) -> Self {
        let remote: Arc<dyn RemoteStore> = if config.remote.enabled {
            Arc::new(CommandRemote::new(&config.remote))
        } else {
            Arc::new(NoopRemote)
        };

        Self {
            reference_root: config.sync.reference_root.clone(),
            target_root: config.sync.target_root.clone(),
            create_target: config.sync.create_target,
            snapshot_builder: SnapshotBuilder::new(config.diff.timestamp_source),
            diff_engine: DiffEngine::new(DiffConfig::from(&config.diff)),
            applier: LocalApplier::new(&config.sync.reference_root, &config.sync.target_root),
            remote,
            observer: Arc::new(NullObserver),
            cancel: CancelFlag::new(),
        }
    }

    /// Replace the remote store
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = remote;
        self
    }

    /// Attach an observer receiving every [`SyncEvent`]
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that stops the run between two items
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Reference root (A)
    pub fn reference_root(&self) -> &Path {
        &self.reference_root
    }

    /// Target root (B)
    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// Snapshot both roots and diff them without touching either side
    ///
    /// A missing target root is compared as an empty tree.
    pub async fn compare(&self) -> Result<ChangeSet> {
        self.check_reference()?;
        let (reference, target) = self.snapshots(!self.target_root.is_dir()).await?;
        Ok(self.diff_engine.compare(&reference, &target))
    }

    /// Reconcile the target with the reference
    pub async fn run(&self) -> Result<SyncReport> {
        self.execute(false).await
    }

    /// Compute and log the plan without mutating anything
    pub async fn dry_run(&self) -> Result<SyncReport> {
        self.execute(true).await
    }

    async fn execute(&self, dry_run: bool) -> Result<SyncReport> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4();
        let mut report = SyncReport::new(run_id, &self.reference_root, &self.target_root, dry_run);

        info!(
            "Starting sync run {}: {} -> {}{}",
            run_id,
            self.reference_root.display(),
            self.target_root.display(),
            if dry_run { " (dry run)" } else { "" }
        );
        self.emit(SyncEvent::RunStarted {
            run_id,
            reference: self.reference_root.clone(),
            target: self.target_root.clone(),
            dry_run,
        });

        let target_missing = self.prepare(dry_run).await?;
        let (reference, target) = self.snapshots(target_missing).await?;
        let changes = self.diff_engine.compare(&reference, &target);

        report.added = changes.added.len();
        report.deleted = changes.deleted.len();
        report.modified = changes.modified.len();
        self.emit(SyncEvent::PlanReady {
            added: report.added,
            deleted: report.deleted,
            modified: report.modified,
        });

        self.reconcile(&changes, dry_run, &mut report).await;

        report.duration = start.elapsed();
        info!(
            "Sync run {} finished in {:.2}s: {} copied into target, {} removed from target, {} failures{}",
            run_id,
            report.duration.as_secs_f64(),
            report.copied_into_target(),
            report.removed_from_target(),
            report.failures(),
            if report.interrupted { " (interrupted)" } else { "" }
        );
        self.emit(SyncEvent::RunFinished {
            run_id,
            interrupted: report.interrupted,
        });

        Ok(report)
    }

    /// Apply a change set phase by phase, stopping early if cancelled
    async fn reconcile(&self, changes: &ChangeSet, dry_run: bool, report: &mut SyncReport) {
        for phase in SyncPhase::ORDER {
            let completed = match phase {
                SyncPhase::Modify => self.modify_phase(&changes.modified, dry_run, report).await,
                SyncPhase::AddToTarget => self.add_phase(&changes.deleted, dry_run, report).await,
                SyncPhase::PurgeFromTarget => {
                    self.purge_phase(&changes.purge_order(), dry_run, report)
                        .await
                }
            };
            if !completed {
                report.interrupted = true;
                return;
            }
        }
    }

    fn check_reference(&self) -> Result<()> {
        if !self.reference_root.is_dir() {
            error!(
                "Reference directory does not exist: {}",
                self.reference_root.display()
            );
            return Err(Error::config(format!(
                "Reference directory does not exist: {}",
                self.reference_root.display()
            )));
        }
        Ok(())
    }

    /// Check run preconditions; returns whether the target is still missing afterwards
    async fn prepare(&self, dry_run: bool) -> Result<bool> {
        self.check_reference()?;

        if self.target_root.is_dir() {
            return Ok(false);
        }
        if !self.create_target {
            return Err(Error::config(format!(
                "Target directory does not exist: {}",
                self.target_root.display()
            )));
        }
        if dry_run {
            info!(
                "DRY RUN: would create target directory {}",
                self.target_root.display()
            );
            return Ok(true);
        }

        fs::create_dir_all(&self.target_root)
            .await
            .map_err(|e| {
                error!(
                    "Failed to create target directory '{}': {}",
                    self.target_root.display(),
                    e
                );
                Error::Io {
                    message: format!(
                        "Failed to create target directory '{}': {}",
                        self.target_root.display(),
                        e
                    ),
                }
            })?;
        info!("Created target directory {}", self.target_root.display());
        Ok(false)
    }

    async fn snapshots(&self, target_missing: bool) -> Result<(Snapshot, Snapshot)> {
        let reference = self
            .snapshot_builder
            .build_async(&self.reference_root)
            .await
            .map_err(|e| {
                error!("Failed to scan reference directory: {}", e);
                e
            })?;

        let target = if target_missing {
            Snapshot::new(&self.target_root)
        } else {
            self.snapshot_builder
                .build_async(&self.target_root)
                .await
                .map_err(|e| {
                    error!("Failed to scan target directory: {}", e);
                    e
                })?
        };

        Ok((reference, target))
    }

    /// Remote remove, local overwrite, upload; a failed step skips the rest of the item
    async fn modify_phase(
        &self,
        entries: &[ModifiedEntry],
        dry_run: bool,
        report: &mut SyncReport,
    ) -> bool {
        let phase = SyncPhase::Modify;
        if !self.begin_phase(phase, entries.len(), report) {
            return true;
        }

        for entry in entries {
            if self.interrupted(phase) {
                return false;
            }
            let path = &entry.path;
            info!("Updating {} {}", path, entry.details());

            if dry_run {
                self.planned(phase, path, "replace");
                continue;
            }

            let stats = report.phase_mut(phase);
            if let Err(e) = self.remote.remove(path).await {
                self.step_failed(phase, path, SyncStep::RemoteRemove, &e);
                warn!("Skipping overwrite of {} after failed remote removal", path);
                stats.remote_failures += 1;
                self.item_finished(phase, path);
                continue;
            }
            self.remote_removed(phase, path);

            self.copy_and_upload(phase, path, stats).await;
            self.item_finished(phase, path);
        }
        true
    }

    /// Copy into the target, then upload; a failed copy skips the upload
    async fn add_phase(
        &self,
        paths: &[RelativePath],
        dry_run: bool,
        report: &mut SyncReport,
    ) -> bool {
        let phase = SyncPhase::AddToTarget;
        if !self.begin_phase(phase, paths.len(), report) {
            return true;
        }

        for path in paths {
            if self.interrupted(phase) {
                return false;
            }
            if dry_run {
                self.planned(phase, path, "copy");
                continue;
            }

            self.copy_and_upload(phase, path, report.phase_mut(phase))
                .await;
            self.item_finished(phase, path);
        }
        true
    }

    /// Delete from the target, then remove remotely, deepest paths first
    async fn purge_phase(
        &self,
        paths: &[RelativePath],
        dry_run: bool,
        report: &mut SyncReport,
    ) -> bool {
        let phase = SyncPhase::PurgeFromTarget;
        if !self.begin_phase(phase, paths.len(), report) {
            return true;
        }

        for path in paths {
            if self.interrupted(phase) {
                return false;
            }
            if dry_run {
                self.planned(phase, path, "delete");
                continue;
            }

            let stats = report.phase_mut(phase);
            match self.applier.delete_file(path).await {
                Ok(outcome) => {
                    let already_absent = outcome == DeleteOutcome::AlreadyAbsent;
                    if !already_absent {
                        info!("Deleted from target: {}", path);
                    }
                    stats.applied += 1;
                    self.emit(SyncEvent::LocalDeleted {
                        path: path.clone(),
                        already_absent,
                    });
                }
                Err(e) => {
                    self.step_failed(phase, path, SyncStep::LocalDelete, &e);
                    stats.local_failures += 1;
                    self.item_finished(phase, path);
                    continue;
                }
            }

            match self.remote.remove(path).await {
                Ok(_) => {
                    stats.mirrored += 1;
                    self.remote_removed(phase, path);
                }
                Err(e) => {
                    self.step_failed(phase, path, SyncStep::RemoteRemove, &e);
                    stats.remote_failures += 1;
                }
            }
            self.item_finished(phase, path);
        }
        true
    }

    /// Copy `path` into the target and upload it; a failed copy skips the upload
    async fn copy_and_upload(&self, phase: SyncPhase, path: &RelativePath, stats: &mut PhaseStats) {
        let bytes = match self.applier.copy_file(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.step_failed(phase, path, SyncStep::LocalCopy, &e);
                stats.local_failures += 1;
                return;
            }
        };
        info!("Copied into target: {} ({} bytes)", path, bytes);
        stats.applied += 1;
        stats.bytes_copied += bytes;
        self.emit(SyncEvent::LocalCopied {
            phase,
            path: path.clone(),
            bytes,
        });

        let local_path = path.to_native(self.applier.dest_root());
        match self.remote.upload(&local_path, path).await {
            Ok(_) => {
                stats.mirrored += 1;
                info!("Uploaded: {}", path);
                self.emit(SyncEvent::RemoteUploaded {
                    phase,
                    path: path.clone(),
                });
            }
            Err(e) => {
                self.step_failed(phase, path, SyncStep::RemoteUpload, &e);
                stats.remote_failures += 1;
            }
        }
    }

    /// Record the phase size; returns whether there is anything to do
    fn begin_phase(&self, phase: SyncPhase, items: usize, report: &mut SyncReport) -> bool {
        *report.phase_mut(phase) = PhaseStats::planned(items as u64);
        if items == 0 {
            return false;
        }
        info!("Phase {}: {} items", phase, items);
        self.emit(SyncEvent::PhaseStarted { phase, items });
        true
    }

    fn interrupted(&self, phase: SyncPhase) -> bool {
        if !self.cancel.is_cancelled() {
            return false;
        }
        warn!("Sync interrupted during phase {}", phase);
        self.emit(SyncEvent::Interrupted { phase });
        true
    }

    fn planned(&self, phase: SyncPhase, path: &RelativePath, action: &str) {
        info!("DRY RUN: would {} {}", action, path);
        self.emit(SyncEvent::Planned {
            phase,
            path: path.clone(),
        });
    }

    fn remote_removed(&self, phase: SyncPhase, path: &RelativePath) {
        info!("Removed from remote: {}", path);
        self.emit(SyncEvent::RemoteRemoved {
            phase,
            path: path.clone(),
        });
    }

    fn step_failed(&self, phase: SyncPhase, path: &RelativePath, step: SyncStep, e: &Error) {
        match e.severity() {
            ErrorSeverity::Low => warn!("[{}] {} failed for {}: {}", phase, step, path, e),
            _ => error!("[{}] {} failed for {}: {}", phase, step, path, e),
        }
        self.emit(SyncEvent::StepFailed {
            phase,
            path: path.clone(),
            step,
            message: e.to_string(),
        });
    }

    fn item_finished(&self, phase: SyncPhase, path: &RelativePath) {
        self.emit(SyncEvent::ItemFinished {
            phase,
            path: path.clone(),
        });
    }

    fn emit(&self, event: SyncEvent) {
        self.observer.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn config_for(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.sync.reference_root = temp_dir.path().join("a");
        config.sync.target_root = temp_dir.path().join("b");
        config.diff.timestamp_source = dirmirror_types::TimestampSource::Modified;
        config.remote.enabled = false;
        config
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<SyncEvent>>);

    impl SyncObserver for Events {
        fn on_event(&self, event: &SyncEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_missing_reference_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let engine = SyncEngine::new(&config_for(&temp_dir));

        let result = engine.run().await;
        assert!(matches!(result, Err(Error::Config { .. })));
        assert!(!temp_dir.path().join("b").exists());
    }

    #[tokio::test]
    async fn test_missing_target_is_created() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        std::fs::write(temp_dir.path().join("a/a.txt"), b"abc").unwrap();

        let report = SyncEngine::new(&config_for(&temp_dir)).run().await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.add_to_target.applied, 1);
        assert_eq!(report.add_to_target.mirrored, 1);
        assert_eq!(
            std::fs::read(temp_dir.path().join("b/a.txt")).unwrap(),
            b"abc"
        );
    }

    #[tokio::test]
    async fn test_missing_target_without_create_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        let mut config = config_for(&temp_dir);
        config.sync.create_target = false;

        let result = SyncEngine::new(&config).run().await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_dry_run_reports_missing_target_without_create() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        let mut config = config_for(&temp_dir);
        config.sync.create_target = false;

        let result = SyncEngine::new(&config).dry_run().await;
        assert!(matches!(result, Err(Error::Config { .. })));
        assert!(!temp_dir.path().join("b").exists());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        std::fs::write(temp_dir.path().join("a/new.txt"), b"new").unwrap();

        let events = Arc::new(Events::default());
        let engine = SyncEngine::new(&config_for(&temp_dir)).with_observer(events.clone());
        let report = engine.dry_run().await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.add_to_target.applied, 0);
        assert!(!temp_dir.path().join("b").exists());

        let events = events.0.lock().unwrap();
        assert!(events.iter().any(|event| matches!(
            event,
            SyncEvent::Planned {
                phase: SyncPhase::AddToTarget,
                ..
            }
        )));
        assert!(!events
            .iter()
            .any(|event| matches!(event, SyncEvent::LocalCopied { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_before_first_item() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("b")).unwrap();
        std::fs::write(temp_dir.path().join("a/one.txt"), b"1").unwrap();
        std::fs::write(temp_dir.path().join("b/extra.txt"), b"2").unwrap();

        let engine = SyncEngine::new(&config_for(&temp_dir));
        engine.cancel_flag().cancel();
        let report = engine.run().await.unwrap();

        assert!(report.interrupted);
        assert_eq!(report.add_to_target.planned, 1);
        assert_eq!(report.add_to_target.applied, 0);
        assert!(!temp_dir.path().join("b/one.txt").exists());
        assert!(temp_dir.path().join("b/extra.txt").exists());
        assert!(matches!(report.ensure_complete(), Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_compare_treats_missing_target_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        std::fs::write(temp_dir.path().join("a/a.txt"), b"abc").unwrap();

        let changes = SyncEngine::new(&config_for(&temp_dir))
            .compare()
            .await
            .unwrap();
        assert_eq!(changes.deleted, vec![RelativePath::new("a.txt").unwrap()]);
        assert!(!temp_dir.path().join("b").exists());
    }

    #[test]
    fn test_run_writes_audit_log() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("b")).unwrap();
        std::fs::write(temp_dir.path().join("a/kept.txt"), b"kept").unwrap();
        std::fs::write(temp_dir.path().join("b/stale.txt"), b"stale").unwrap();

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let engine = SyncEngine::new(&config_for(&temp_dir));
        let report = tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(engine.run())
        })
        .unwrap();
        assert_eq!(report.copied_into_target(), 1);
        assert_eq!(report.removed_from_target(), 1);

        let log = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("1 extra in target, 1 missing from target, 0 to update"));
        assert!(log.contains("Copied into target: kept.txt"));
        assert!(log.contains("Deleted from target: stale.txt"));
    }

    #[test]
    fn test_vanished_source_is_logged_as_warning() {
        let temp_dir = TempDir::new().unwrap();
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let engine = SyncEngine::new(&config_for(&temp_dir));
        let path = RelativePath::new("gone.txt").unwrap();
        tracing::subscriber::with_default(subscriber, || {
            engine.step_failed(
                SyncPhase::AddToTarget,
                &path,
                SyncStep::LocalCopy,
                &Error::FileNotFound {
                    path: temp_dir.path().join("a/gone.txt"),
                },
            );
            engine.step_failed(
                SyncPhase::AddToTarget,
                &path,
                SyncStep::RemoteUpload,
                &Error::remote("upload", Some(1), "quota exceeded"),
            );
        });

        let log = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("WARN"));
        assert!(lines[1].contains("ERROR"));
        assert!(lines[1].contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_completed_run_is_complete() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a")).unwrap();

        let report = SyncEngine::new(&config_for(&temp_dir)).run().await.unwrap();
        assert!(report.ensure_complete().is_ok());
    }

    #[test]
    fn test_report_totals() {
        let mut report = SyncReport::new(uuid::Uuid::new_v4(), Path::new("a"), Path::new("b"), false);
        assert!(report.already_in_sync());

        report.deleted = 2;
        report.modified = 1;
        report.added = 3;
        report.modify.remote_failures = 1;
        report.purge_from_target.local_failures = 2;

        assert!(!report.already_in_sync());
        assert_eq!(report.copied_into_target(), 3);
        assert_eq!(report.removed_from_target(), 3);
        assert_eq!(report.failures(), 3);
        assert_eq!(report.phase(SyncPhase::Modify).remote_failures, 1);
    }
}
