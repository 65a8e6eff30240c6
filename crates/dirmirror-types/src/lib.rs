//! Core type system and error handling for dirmirror
//!
//! This crate provides the foundational types, error handling, and shared data structures
//! used throughout the dirmirror workspace. It includes:
//!
//! - **Error handling**: error types with kinds and severity levels
//! - **Core types**: relative paths, file records, phase statistics
//! - **Traits**: the remote store, sync observer and cancellation seams
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `async`: Enable the async [`RemoteStore`] trait
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use dirmirror_types::{FileRecord, RelativePath};
//! use std::time::SystemTime;
//!
//! let path = RelativePath::new("docs/readme.md").unwrap();
//! let record = FileRecord::new(path, SystemTime::UNIX_EPOCH, 42);
//! assert_eq!(record.relative_path.as_str(), "docs/readme.md");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use traits::*;
pub use types::*;
