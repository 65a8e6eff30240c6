//! Configuration builder for layered configuration loading

use crate::{Config, ConfigError, ConfigResult};
use config::{ConfigBuilder as ConfigBuilderInner, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration builder for loading configuration from multiple sources
///
/// Sources are applied in insertion order on top of [`Config::default`]; later sources win.
#[derive(Debug)]
pub struct ConfigBuilder {
    inner: ConfigBuilderInner<config::builder::DefaultState>,
    sources: Vec<ConfigSource>,
    env_separator: String,
}

#[derive(Debug, Clone)]
enum ConfigSource {
    File { path: PathBuf, format: FileFormat },
    Defaults,
    Environment { prefix: String },
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            inner: config::Config::builder(),
            sources: Vec::new(),
            env_separator: "__".to_string(),
        }
    }

    /// Add default configuration values
    pub fn add_defaults(mut self) -> Self {
        self.sources.push(ConfigSource::Defaults);
        self
    }

    /// Add a configuration file source; missing files are ignored
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Self::detect_format(&path);
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add environment variable source with prefix (`PREFIX__SECTION__KEY`)
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(ConfigSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Set environment variable separator (default: "__")
    pub fn env_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(mut self) -> ConfigResult<Config> {
        let defaults = Config::default();
        let defaults_value = serde_yaml::to_value(&defaults)
            .map_err(|e| ConfigError::other(format!("Failed to serialize defaults: {}", e)))?;
        self.inner = self
            .inner
            .add_source(config::Config::try_from(&defaults_value)?);

        for source in &self.sources {
            match source {
                ConfigSource::File { path, format } => {
                    if path.exists() {
                        self.inner = self
                            .inner
                            .add_source(File::from(path.clone()).format(*format));
                    }
                }
                ConfigSource::Environment { prefix } => {
                    self.inner = self.inner.add_source(
                        Environment::with_prefix(prefix)
                            .prefix_separator(&self.env_separator)
                            .separator(&self.env_separator)
                            .try_parsing(true),
                    );
                }
                ConfigSource::Defaults => {
                    // Already the base layer
                }
            }
        }

        let config = self.inner.build()?;
        let result: Config = config.try_deserialize()?;

        Self::validate(&result)?;

        Ok(result)
    }

    /// Try to build the configuration, returning defaults on error
    pub fn build_or_default(self) -> Config {
        self.build().unwrap_or_default()
    }

    /// Detect file format from extension
    fn detect_format(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    /// Validate the configuration
    ///
    /// Root existence is a run precondition checked by the sync engine, not here.
    pub fn validate(config: &Config) -> ConfigResult<()> {
        let tolerance = config.diff.time_tolerance_secs;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::invalid_value(
                "diff.time_tolerance_secs",
                "must be a finite, non-negative number of seconds",
            ));
        }

        if config.remote.enabled {
            if config.remote.client.as_os_str().is_empty() {
                return Err(ConfigError::missing_required("remote.client"));
            }
            if config.remote.remote_root.trim().is_empty() {
                return Err(ConfigError::missing_required("remote.remote_root"));
            }
            if config.remote.upload_command.trim().is_empty() {
                return Err(ConfigError::missing_required("remote.upload_command"));
            }
            if config.remote.remove_command.trim().is_empty() {
                return Err(ConfigError::missing_required("remote.remove_command"));
            }
        }

        if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "Log level must be one of: trace, debug, info, warn, error",
            ));
        }

        if config.logging.enable_file_logging && config.logging.log_file.trim().is_empty() {
            return Err(ConfigError::missing_required("logging.log_file"));
        }

        Ok(())
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogRotation;
    use dirmirror_types::TimestampSource;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().add_defaults().build().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_builder_with_yaml_file() {
        let mut temp_file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            temp_file,
            r#"
sync:
  reference_root: /srv/reference
  target_root: /srv/target
diff:
  time_tolerance_secs: 4.0
  timestamp_source: created
remote:
  client: /usr/local/bin/pcs
  remote_root: /backup/
logging:
  level: debug
  rotation: daily
"#
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(temp_file.path())
            .build()
            .unwrap();

        assert_eq!(config.sync.reference_root, PathBuf::from("/srv/reference"));
        assert_eq!(config.sync.target_root, PathBuf::from("/srv/target"));
        assert_eq!(config.diff.time_tolerance_secs, 4.0);
        assert_eq!(config.diff.timestamp_source, TimestampSource::Created);
        assert_eq!(config.remote.client, PathBuf::from("/usr/local/bin/pcs"));
        assert_eq!(config.remote.remote_root, "/backup/");
        assert_eq!(config.remote.remove_command, "rm");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.rotation, LogRotation::Daily);
    }

    #[test]
    fn test_builder_with_toml_file() {
        let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            temp_file,
            r#"
[remote]
enabled = false
client = ""
"#
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(temp_file.path())
            .build()
            .unwrap();

        assert!(!config.remote.enabled);
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file("/nonexistent/dirmirror.yaml")
            .build()
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validation_rejects_negative_tolerance() {
        let mut config = Config::default();
        config.diff.time_tolerance_secs = -0.5;
        assert!(matches!(
            ConfigBuilder::validate(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validation_requires_client_when_enabled() {
        let mut config = Config::default();
        config.remote.client = PathBuf::new();
        assert!(matches!(
            ConfigBuilder::validate(&config),
            Err(ConfigError::MissingRequired { .. })
        ));

        config.remote.enabled = false;
        assert!(ConfigBuilder::validate(&config).is_ok());
    }

    #[test]
    fn test_validation_rejects_unknown_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigBuilder::validate(&config),
            Err(ConfigError::Validation { .. })
        ));
    }
}
