//! Error types and handling for dirmirror
//!
//! Every fallible operation in the workspace reports a [`Error`]. Per-item failures are
//! recovered by the reconciliation driver; only precondition failures reach the caller.

use std::path::PathBuf;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - operation can continue
    Low,
    /// Medium severity - the current item failed, the run continues
    Medium,
    /// High severity - the run cannot start or must stop
    High,
}

/// Main error type for dirmirror operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found
        path: PathBuf,
    },

    /// Permission denied
    #[error("Permission denied: {path}")]
    PermissionDenied {
        /// Path to the file with permission issues
        path: PathBuf,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// External storage client failed or could not be launched
    #[error("Remote {operation} failed (exit code: {}): {stderr}", format_code(.code))]
    Remote {
        /// Remote operation that failed (`upload`, `rm`, ...)
        operation: String,
        /// Exit code of the client, `None` when the process did not run to completion
        code: Option<i32>,
        /// Captured standard error, or the launch error message
        stderr: String,
    },

    /// Synchronization error
    #[error("Synchronization error: {message}")]
    Sync {
        /// Error message describing the synchronization issue
        message: String,
    },

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,
}

fn format_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// Configuration errors
    Config,
    /// Remote client errors
    Remote,
    /// Synchronization errors
    Sync,
    /// Cancellation
    Cancelled,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::FileNotFound { .. } | Self::PermissionDenied { .. } => {
                ErrorKind::Io
            }
            Self::Config { .. } => ErrorKind::Config,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::Sync { .. } => ErrorKind::Sync,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Io { .. } => ErrorSeverity::Medium,
            Self::FileNotFound { .. } => ErrorSeverity::Low,
            Self::PermissionDenied { .. } => ErrorSeverity::Medium,
            Self::Config { .. } => ErrorSeverity::High,
            Self::Remote { .. } => ErrorSeverity::Medium,
            Self::Sync { .. } => ErrorSeverity::High,
            Self::Cancelled => ErrorSeverity::Low,
        }
    }

    /// Check if the run can continue with the next item after this error
    pub fn is_recoverable(&self) -> bool {
        self.severity() <= ErrorSeverity::Medium && !matches!(self, Self::Cancelled)
    }

    /// Map an I/O error on `path` to the most specific variant
    pub fn from_io(error: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io {
                message: format!("{}: {}", path.display(), error),
            },
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new remote client error
    pub fn remote<S: Into<String>>(operation: S, code: Option<i32>, stderr: S) -> Self {
        Self::Remote {
            operation: operation.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Create a new sync error
    pub fn sync<S: Into<String>>(message: S) -> Self {
        Self::Sync {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
