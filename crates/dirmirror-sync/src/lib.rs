//! One-way directory mirroring with remote propagation
//!
//! This crate keeps a target tree identical to a reference tree and mirrors every local
//! mutation of the target into a remote store:
//!
//! - **Snapshots**: metadata-only walks of both roots (relative path, creation time, size)
//! - **Diff**: classification into added, deleted and modified paths under a time tolerance
//! - **Local apply**: copy with timestamps, delete with "already absent" tolerance
//! - **Remote propagation**: an external command-line client behind the [`RemoteStore`] trait
//! - **Reconciliation**: modify, add-to-target and purge-from-target phases, item by item
//!
//! # Examples
//!
//! ```rust,no_run
//! use dirmirror_config::Config;
//! use dirmirror_sync::SyncEngine;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.sync.reference_root = "reference".into();
//! config.sync.target_root = "target".into();
//!
//! let report = SyncEngine::new(&config).run().await?;
//! println!(
//!     "{} copied into target, {} removed from target",
//!     report.copied_into_target(),
//!     report.removed_from_target()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! [`RemoteStore`]: dirmirror_types::RemoteStore

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod apply;
pub mod diff;
pub mod engine;
pub mod remote;
pub mod snapshot;

pub use apply::{DeleteOutcome, LocalApplier};
pub use diff::{diff, ChangeSet, DiffConfig, DiffEngine, ModificationReason, ModifiedEntry};
pub use engine::{SyncEngine, SyncReport};
pub use remote::{remote_object_path, remote_parent_dir, CommandRemote, NoopRemote};
pub use snapshot::{Snapshot, SnapshotBuilder};
