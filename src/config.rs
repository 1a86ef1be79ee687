//! Configuration for cellwin.
//!
//! This module provides TOML configuration loading from
//! `~/.cellwin/config.toml`. Every field has a default, so a missing file or a
//! partial file is fine.
//!
//! # Configuration File
//!
//! ```toml
//! [input]
//! # Reject unknown mouse event names instead of ignoring them
//! strict_mouse_names = false
//! # Longest press-to-release gap reported as a click
//! mouse_interval_ms = 166
//! # Input timeout in tenths of a second (1..=255); omit to block
//! half_delay = 5
//!
//! [draw]
//! # Clip lines at the window edge instead of failing
//! clip_lines = true
//! tab_width = 8
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Keyboard and mouse settings
    pub input: InputConfig,
    /// Drawing settings
    pub draw: DrawConfig,
}

/// Input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub strict_mouse_names: bool,
    pub mouse_interval_ms: u64,
    pub half_delay: Option<u8>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            strict_mouse_names: false,
            mouse_interval_ms: 166,
            half_delay: None,
        }
    }
}

impl InputConfig {
    pub fn mouse_interval(&self) -> Duration {
        Duration::from_millis(self.mouse_interval_ms)
    }
}

/// Drawing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    pub clip_lines: bool,
    pub tab_width: u16,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            clip_lines: true,
            tab_width: 8,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::get_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Self::default();
        }
        match fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Ignoring malformed config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Cannot read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".cellwin").join("config.toml"))
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
