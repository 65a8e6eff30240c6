//! Configuration management system for dirmirror
//!
//! The reference and target roots, the diff tolerance, the external storage client and the
//! log sinks are all fixed per job. They are loaded once, layered from defaults, an optional
//! YAML/TOML/JSON file and `DIRMIRROR__*` environment variables, and then passed explicitly into
//! every component.
//!
//! # Examples
//!
//! ```rust
//! use dirmirror_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("dirmirror.yaml")
//!     .add_env_prefix("DIRMIRROR")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Tolerance: {:?}", config.diff.tolerance());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use dirmirror_types::TimestampSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Default tolerance between two creation times, in seconds
pub const DEFAULT_TIME_TOLERANCE_SECS: f64 = 2.5;

/// Main configuration structure for dirmirror
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory pair to synchronize
    #[serde(default)]
    pub sync: SyncSettings,
    /// Equality rule used by the diff engine
    #[serde(default)]
    pub diff: DiffSettings,
    /// External storage client
    #[serde(default)]
    pub remote: RemoteSettings,
    /// Log sinks
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Directory pair settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Authoritative tree (A)
    #[serde(default)]
    pub reference_root: PathBuf,
    /// Tree mutated to match the reference (B)
    #[serde(default)]
    pub target_root: PathBuf,
    /// Create the target root when it is missing
    #[serde(default = "default_true")]
    pub create_target: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            reference_root: PathBuf::new(),
            target_root: PathBuf::new(),
            create_target: true,
        }
    }
}

/// Diff equality rule settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffSettings {
    /// Maximum creation-time distance still considered equal
    #[serde(default = "default_tolerance")]
    pub time_tolerance_secs: f64,
    /// Timestamp compared as the creation time
    #[serde(default)]
    pub timestamp_source: TimestampSource,
}

impl DiffSettings {
    /// Tolerance as a [`Duration`]; invalid values collapse to zero
    pub fn tolerance(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_tolerance_secs).unwrap_or_default()
    }
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            time_tolerance_secs: DEFAULT_TIME_TOLERANCE_SECS,
            timestamp_source: TimestampSource::default(),
        }
    }
}

/// External storage client settings
///
/// The client is invoked as `<client> <upload_command> <local file> <remote parent dir>` and
/// `<client> <remove_command> <remote object path>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Mirror changes to the remote store at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Executable of the storage client
    #[serde(default = "default_client")]
    pub client: PathBuf,
    /// Remote directory the target tree maps to
    #[serde(default = "default_remote_root")]
    pub remote_root: String,
    /// Sub-command used for uploads
    #[serde(default = "default_upload_command")]
    pub upload_command: String,
    /// Sub-command used for removals
    #[serde(default = "default_remove_command")]
    pub remove_command: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            client: default_client(),
            remote_root: default_remote_root(),
            upload_command: default_upload_command(),
            remove_command: default_remove_command(),
        }
    }
}

/// Rotation policy of the file log sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Single append-only file
    #[default]
    Never,
    /// One file per hour
    Hourly,
    /// One file per day
    Daily,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_level")]
    pub level: String,
    /// Enable file logging
    #[serde(default = "default_true")]
    pub enable_file_logging: bool,
    /// Directory holding the log file
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name (prefix when rotating)
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Rotation policy
    #[serde(default)]
    pub rotation: LogRotation,
    /// Enable colored console output
    #[serde(default = "default_true")]
    pub colored_output: bool,
}

impl LoggingConfig {
    /// Full path of the (un-rotated) log file
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            enable_file_logging: true,
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            rotation: LogRotation::Never,
            colored_output: true,
        }
    }
}

// Default value functions for serde defaults
fn default_true() -> bool {
    true
}

fn default_tolerance() -> f64 {
    DEFAULT_TIME_TOLERANCE_SECS
}

fn default_client() -> PathBuf {
    PathBuf::from("BaiduPCS-Go")
}

fn default_remote_root() -> String {
    "/sync/".to_string()
}

fn default_upload_command() -> String {
    "upload".to_string()
}

fn default_remove_command() -> String {
    "rm".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_file() -> String {
    "sync_log.txt".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.diff.time_tolerance_secs, 2.5);
        assert_eq!(config.diff.tolerance(), Duration::from_millis(2_500));
        assert!(config.sync.create_target);
        assert!(config.remote.enabled);
        assert_eq!(config.remote.upload_command, "upload");
        assert_eq!(config.remote.remove_command, "rm");
        assert_eq!(config.logging.log_path(), PathBuf::from("./sync_log.txt"));
    }

    #[test]
    fn test_invalid_tolerance_collapses_to_zero() {
        let diff = DiffSettings {
            time_tolerance_secs: -1.0,
            ..DiffSettings::default()
        };
        assert_eq!(diff.tolerance(), Duration::ZERO);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "sync:\n  reference_root: /data/a\n  target_root: /data/b\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.sync.reference_root, PathBuf::from("/data/a"));
        assert!(config.sync.create_target);
        assert_eq!(config.remote, RemoteSettings::default());
        assert_eq!(config.logging.rotation, LogRotation::Never);
    }
}
