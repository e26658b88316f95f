//! Configuration for the atlas tool.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 2_000;
pub const MIN_REFRESH_INTERVAL_MS: u64 = 250;
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AtlasConfig {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub interval_ms: u64,
    /// Ring the terminal bell when a workspace starts needing attention.
    pub bell: bool,
    /// Table only: no title, no footer, no bell.
    pub quiet: bool,
    pub show_progress: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            bell: true,
            quiet: false,
            show_progress: false,
        }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_REFRESH_INTERVAL_MS))
    }

    /// Alerts fire only when enabled and the display is not quiet.
    pub fn alerts_enabled(&self) -> bool {
        self.bell && !self.quiet
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

pub fn parse_config(contents: &str) -> Result<AtlasConfig, toml::de::Error> {
    toml::from_str(contents)
}

pub fn config_path(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join(CONFIG_FILE_NAME)
}

/// Load `<root>/config.toml`. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<AtlasConfig, ConfigError> {
    let path_ref = path.as_ref();
    let body = match fs::read_to_string(path_ref) {
        Ok(body) => body,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path_ref.display(), "config file missing, using defaults");
            return Ok(AtlasConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path_ref.to_path_buf(),
                source,
            })
        }
    };
    parse_config(&body).map_err(|source| ConfigError::Parse {
        path: path_ref.to_path_buf(),
        source,
    })
}
