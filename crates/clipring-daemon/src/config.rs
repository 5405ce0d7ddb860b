//! Configuration loading and defaults.

use global_hotkey::hotkey::HotKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::detector::DEFAULT_POLL_INTERVAL_MS;
use crate::history::MAX_HISTORY;
use crate::paste::DEFAULT_SETTLE_DELAY_MS;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub paste: PasteConfig,
    #[serde(default)]
    pub hotkeys: HotkeyConfig,
}

/// History-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of entries to keep.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

/// Clipboard polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Milliseconds between clipboard samples.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DetectorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Paste injection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasteConfig {
    /// Milliseconds to wait after hiding the surface before pasting.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Simulate the paste keystroke after copying a text entry.
    #[serde(default = "default_true")]
    pub auto_paste: bool,
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            auto_paste: true,
        }
    }
}

impl PasteConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Global shortcut configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Shows or hides the history surface.
    #[serde(default = "default_toggle_hotkey")]
    pub toggle: String,
    /// Hides the history surface while it is shown.
    ///
    /// The shortcut is grabbed globally for as long as the daemon runs, so
    /// with the default `Escape` other applications stop receiving Escape on
    /// X11. Pick a combination with modifiers there, such as
    /// `CmdOrCtrl+Shift+Escape`.
    #[serde(default = "default_hide_hotkey")]
    pub hide: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            toggle: default_toggle_hotkey(),
            hide: default_hide_hotkey(),
        }
    }
}

impl HotkeyConfig {
    /// Parse the toggle and hide shortcuts.
    pub fn parse(&self) -> Result<(HotKey, HotKey), ConfigError> {
        Ok((parse_hotkey(&self.toggle)?, parse_hotkey(&self.hide)?))
    }
}

fn parse_hotkey(shortcut: &str) -> Result<HotKey, ConfigError> {
    HotKey::from_str(shortcut)
        .map_err(|e| ConfigError::Invalid(format!("bad hotkey '{}': {}", shortcut, e)))
}

fn default_max_entries() -> usize {
    MAX_HISTORY
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_true() -> bool {
    true
}

fn default_toggle_hotkey() -> String {
    "CmdOrCtrl+Shift+V".to_string()
}

fn default_hide_hotkey() -> String {
    "Escape".to_string()
}

impl Config {
    /// Load configuration from file, or return defaults if file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = clipring_common::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "history.max_entries must be at least 1".to_string(),
            ));
        }
        if self.detector.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "detector.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.hotkeys.enabled {
            self.hotkeys.parse()?;
        }
        Ok(())
    }
}
