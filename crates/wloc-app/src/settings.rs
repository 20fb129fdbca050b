//! Persistent spoofing settings.
//!
//! Stored as JSON at `<config dir>/settings.json`. Command-line flags override
//! what is loaded here for a single run and are only written back on request.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wloc_core::{Coordinates, SpoofConfig};

/// Settings file name.
const SETTINGS_FILENAME: &str = "settings.json";

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No per-user configuration directory on this platform.
    #[error("failed to determine configuration directory")]
    NoConfigDir,

    /// Failed to read or write the settings file.
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON or holds invalid values.
    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// User settings for the spoofing proxy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoofSettings {
    /// Coordinates to report. `None` leaves location traffic untouched.
    pub coordinates: Option<Coordinates>,
    /// Spoofing switched off while keeping the stored coordinates.
    pub disabled: bool,
    /// Proxy port. `None` uses the default.
    pub port: Option<u16>,
}

impl SpoofSettings {
    /// Returns the default settings file path.
    pub fn default_path() -> Result<PathBuf> {
        let dirs =
            ProjectDirs::from("dev", "wloc-spoof", "wloc-spoof").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join(SETTINGS_FILENAME))
    }

    /// Loads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Sets the spoof coordinates and re-enables spoofing.
    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.coordinates = Some(coordinates);
        self.disabled = false;
    }

    /// Forgets the spoof coordinates.
    pub fn clear_coordinates(&mut self) {
        self.coordinates = None;
    }

    /// Returns true if location requests will be rewritten.
    pub fn is_spoofing_enabled(&self) -> bool {
        self.coordinates.is_some() && !self.disabled
    }

    /// Builds the spoof configuration handed to the proxy.
    pub fn spoof_config(&self) -> SpoofConfig {
        match self.coordinates {
            Some(coordinates) if !self.disabled => SpoofConfig::new(coordinates),
            _ => SpoofConfig::disabled(),
        }
    }
}
