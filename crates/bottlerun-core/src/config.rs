use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

/// Top-level configuration for install operations.
///
/// The original tool carried these values as process-wide environment
/// variables and hard-coded constants; here they are an explicit value
/// handed to each component at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallerConfig {
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub watcher: WatcherSettings,
    /// Root under which per-run private directories are allocated.
    /// Defaults to the system temp dir when absent.
    #[serde(default)]
    pub runtime_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplaySettings {
    /// Progress-dialog program spawned to render the operation.
    #[serde(default = "default_display_program")]
    pub program: String,
    #[serde(default = "default_display_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatcherSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Consecutive empty polls required before a directory counts as free.
    #[serde(default = "default_idle_polls")]
    pub idle_polls: u32,
}

fn default_display_program() -> String {
    "zenity".to_string()
}

fn default_display_args() -> Vec<String> {
    vec!["--progress".to_string(), "--auto-close".to_string()]
}

fn default_poll_interval_secs() -> u64 {
    7
}

fn default_idle_polls() -> u32 {
    3
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            program: default_display_program(),
            args: default_display_args(),
        }
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            idle_polls: default_idle_polls(),
        }
    }
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            display: DisplaySettings::default(),
            watcher: WatcherSettings::default(),
            runtime_dir: None,
        }
    }
}

impl InstallerConfig {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse bottlerun config")?;
        if config.display.program.trim().is_empty() {
            return Err(anyhow!("display program must not be empty"));
        }
        if config.watcher.poll_interval_secs == 0 {
            return Err(anyhow!("watcher poll interval must be nonzero"));
        }
        if config.watcher.idle_polls == 0 {
            return Err(anyhow!("watcher idle poll threshold must be nonzero"));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("failed to load config file: {}", path.display()))
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                log::debug!("no config file given, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

impl WatcherSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
