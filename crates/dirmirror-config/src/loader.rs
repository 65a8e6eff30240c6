//! Configuration loader utilities

use crate::{Config, ConfigBuilder, ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// Prefix of the environment variables that override file settings
pub const ENV_PREFIX: &str = "DIRMIRROR";

/// Configuration loader with common loading patterns
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the first file found in the default locations
    pub fn load_default() -> ConfigResult<Config> {
        let mut builder = ConfigBuilder::new().add_defaults();

        if let Some(path) = Self::config_exists() {
            builder = builder.add_source_file(path);
        }

        builder.add_env_prefix(ENV_PREFIX).build()
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Configuration file not found",
                ),
            });
        }

        ConfigBuilder::new()
            .add_defaults()
            .add_source_file(path)
            .add_env_prefix(ENV_PREFIX)
            .build()
    }

    /// Save configuration to a file, format chosen from the extension (YAML by default)
    pub fn save_to_file<P: AsRef<Path>>(config: &Config, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = Self::render(config, path.extension().and_then(|ext| ext.to_str()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Render configuration as `yaml`, `toml` or `json` text
    pub fn render(config: &Config, format: Option<&str>) -> ConfigResult<String> {
        let content = match format {
            Some("toml") => toml::to_string_pretty(config)?,
            Some("json") => serde_json::to_string_pretty(config)?,
            _ => serde_yaml::to_string(config)?,
        };
        Ok(content)
    }

    /// Generate a default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
        Self::save_to_file(&Config::default(), path)
    }

    /// Default configuration file paths in order of preference
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("dirmirror.yaml"),
            PathBuf::from("dirmirror.yml"),
            PathBuf::from("dirmirror.toml"),
            PathBuf::from(".dirmirror.yaml"),
            PathBuf::from(".dirmirror.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join("dirmirror");
            paths.push(dir.join("config.yaml"));
            paths.push(dir.join("config.yml"));
            paths.push(dir.join("config.toml"));
        }

        #[cfg(unix)]
        {
            paths.push(PathBuf::from("/etc/dirmirror/config.yaml"));
            paths.push(PathBuf::from("/etc/dirmirror/config.toml"));
        }

        paths
    }

    /// First existing configuration file in the default locations
    pub fn config_exists() -> Option<PathBuf> {
        Self::default_config_paths()
            .into_iter()
            .find(|path| path.exists())
    }
}

// Cross-platform user config directory detection
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
            })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|home| PathBuf::from(home).join(".config"))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("dirmirror.yaml")]
    #[case("dirmirror.toml")]
    #[case("dirmirror.json")]
    fn test_save_and_load_round_trip(#[case] file_name: &str) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(file_name);

        let mut config = Config::default();
        config.sync.reference_root = PathBuf::from("/srv/a");
        config.sync.target_root = PathBuf::from("/srv/b");
        config.diff.time_tolerance_secs = 1.0;

        ConfigLoader::save_to_file(&config, &path).unwrap();
        let loaded = ConfigLoader::load_from_file(&path).unwrap();

        assert_eq!(loaded.sync, config.sync);
        assert_eq!(loaded.diff.time_tolerance_secs, 1.0);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = ConfigLoader::load_from_file("/nonexistent/dirmirror.yaml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_default_paths_start_in_working_directory() {
        let paths = ConfigLoader::default_config_paths();
        assert_eq!(paths[0], PathBuf::from("dirmirror.yaml"));
    }
}
