//! Client settings

use std::path::{Path, PathBuf};

use anyhow::Context;
use oculus_rx::ListenerConfig;
use serde::{Deserialize, Serialize};

/// Settings read from `~/.config/oculus/settings.json` or `--config`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Status listener configuration
    pub listener: ListenerConfig,
    /// How long auto-detection waits for a status message
    pub discovery_timeout_secs: u64,
    /// Recorded messages larger than this are skipped
    pub max_frame_len: usize,
    /// Log every header field of each ping
    pub dump_frames: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            discovery_timeout_secs: 5,
            max_frame_len: oculus_protocol::framing::DEFAULT_MAX_FRAME_LEN,
            dump_frames: false,
        }
    }
}

impl Settings {
    fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".config").join("oculus"))
    }

    /// Default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load from an explicit file, or the default location if it exists
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::settings_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Write to `path` as pretty-printed JSON
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }
}
