//! Configuration types for the shell and its host bridge.

use crate::attachment::DEFAULT_MAX_ATTACHMENT_BYTES;
use crate::error::{Result, ShellError};
use crate::state::logs::DEFAULT_LOG_CAPACITY;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "SINGULARITY_CONFIG";

/// Top-level shell configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Host process to spawn.
    pub host: HostConfig,
    /// Channel sizing for the in-process bridge.
    pub bridge: BridgeConfig,
    /// Front end behaviour.
    pub ui: UiConfig,
}

/// Host process launch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Executable to run. Looked up on `PATH` when not absolute.
    pub command: String,
    /// Arguments passed to the host.
    pub args: Vec<String>,
    /// Working directory for the host (None = inherit).
    pub working_dir: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            command: "singularity-host".to_owned(),
            args: Vec::new(),
            working_dir: None,
        }
    }
}

/// Channel capacities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Pending command requests before senders wait.
    pub request_capacity: usize,
    /// Buffered pushes per subscriber before the slowest one lags.
    pub event_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_capacity: 64,
            event_capacity: 128,
        }
    }
}

/// Front end settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Host log entries kept for the logs panel.
    pub log_capacity: usize,
    /// Initial theme.
    pub theme: Theme,
    /// Largest attachment that will be encoded and sent.
    pub max_attachment_bytes: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            theme: Theme::Dark,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

impl ShellConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ShellError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ShellError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Returns the default config file path: `~/.config/singularity/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config)
                .join("singularity")
                .join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("singularity")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/singularity-config/config.toml")
        }
    }

    /// Config path honouring [`CONFIG_PATH_ENV`].
    pub fn resolve_config_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_config_path)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ShellConfig::default();
        assert_eq!(config.bridge.request_capacity, 64);
        assert_eq!(config.bridge.event_capacity, 128);
        assert_eq!(config.ui.log_capacity, 100);
        assert_eq!(config.ui.theme, Theme::Dark);
        assert_eq!(config.ui.max_attachment_bytes, 25 * 1024 * 1024);
        assert!(!config.host.command.is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ShellConfig::default();
        config.host.command = "python3".to_owned();
        config.host.args = vec!["main.py".to_owned()];
        config.ui.theme = Theme::Light;

        config.save_to_file(&path).unwrap();
        let loaded = ShellConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ui]\ntheme = \"light\"\n").unwrap();

        let loaded = ShellConfig::from_file(&path).unwrap();
        assert_eq!(loaded.ui.theme, Theme::Light);
        assert_eq!(loaded.ui.log_capacity, 100);
        assert_eq!(loaded.host, HostConfig::default());
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        assert!(matches!(
            ShellConfig::from_file(&path),
            Err(ShellError::Config(_))
        ));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ShellConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, ShellConfig::default());
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = ShellConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("singularity"));
    }
}
