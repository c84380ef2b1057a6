// SPDX-License-Identifier: GPL-3.0-only

//! Runtime configuration
//!
//! Read from `<config dir>/camcaps/config.json`. Every field is optional in
//! the file; anything missing takes the built-in default, and a missing file
//! means all defaults.

use crate::backends::camera::capabilities::ParserConfig;
use crate::backends::camera::types::{CapabilityMap, Resolution};
use crate::constants::{defaults, paths, tool};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Format query binary (`v4l2-ctl` unless overridden)
    pub tool: String,
    /// Deadline for `--list-formats-ext`
    pub probe_timeout_ms: u64,
    /// Deadline for `--info`
    pub info_timeout_ms: u64,
    /// Our own output node, excluded from enumeration
    pub virtual_device: String,
    /// Directory scanned for `video*` nodes
    pub device_dir: PathBuf,
    /// sysfs video4linux class directory
    pub sysfs_dir: PathBuf,
    /// Named pipe of the rendering server
    pub command_pipe: PathBuf,
    /// Preference file; defaults to `settings.json` next to this config
    pub settings_path: Option<PathBuf>,
    /// Capability parsing tunables
    pub parser: ParserConfig,
    /// Resolutions offered when a device reports nothing usable
    pub default_resolutions: Vec<Resolution>,
    /// Frame rates offered for each default resolution
    pub default_fps: Vec<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: tool::NAME.to_string(),
            probe_timeout_ms: tool::PROBE_TIMEOUT.as_millis() as u64,
            info_timeout_ms: tool::INFO_TIMEOUT.as_millis() as u64,
            virtual_device: paths::VIRTUAL_DEVICE.to_string(),
            device_dir: PathBuf::from(paths::DEVICE_DIR),
            sysfs_dir: PathBuf::from(paths::SYSFS_VIDEO4LINUX),
            command_pipe: PathBuf::from(paths::COMMAND_PIPE),
            settings_path: None,
            parser: ParserConfig::default(),
            default_resolutions: defaults::RESOLUTIONS
                .iter()
                .copied()
                .map(Resolution::from)
                .collect(),
            default_fps: defaults::FRAMERATES.to_vec(),
        }
    }
}

impl Config {
    /// `<config dir>/camcaps`, if the platform has a config dir
    pub fn app_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(paths::APP_DIR))
    }

    /// Load from the default location, falling back to defaults on any problem
    pub fn load() -> Self {
        let Some(path) = Self::app_dir().map(|dir| dir.join(paths::CONFIG_FILE)) else {
            debug!("No config directory; using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Load from an explicit file
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn info_timeout(&self) -> Duration {
        Duration::from_millis(self.info_timeout_ms)
    }

    /// Where preferences are persisted
    pub fn settings_path(&self) -> PathBuf {
        if let Some(path) = &self.settings_path {
            return path.clone();
        }
        Self::app_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(paths::SETTINGS_FILE)
    }

    /// Built-in capability table used as the negotiation safety net
    pub fn default_capabilities(&self) -> CapabilityMap {
        CapabilityMap::from_entries(
            self.default_resolutions
                .iter()
                .map(|resolution| (*resolution, self.default_fps.clone())),
        )
    }
}
