//! dirmirror testing suite
//!
//! Integration tests and benchmarks for the dirmirror workspace, plus the fixtures they
//! share.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Directory-pair builders, a recording remote store and a recording observer.
pub mod test_utils;

pub use test_utils::{MockRemote, RecordingObserver, RemoteCall, TestTree};
