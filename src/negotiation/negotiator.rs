// SPDX-License-Identifier: GPL-3.0-only

//! Format selection
//!
//! Reconciles what a device reports with what the user chose last time.
//! The result is always a member of the table it was picked from: the
//! device's capabilities, or the built-in defaults when the device reported
//! nothing usable.

use super::preferences::PreferenceStore;
use crate::backends::camera::types::{CapabilityMap, Resolution, Selection};
use crate::config::Config;
use crate::constants::{defaults, framerates, keys};
use serde_json::json;
use tracing::{debug, info, warn};

/// Picks a concrete (resolution, fps) pair
#[derive(Debug, Clone)]
pub struct Negotiator {
    defaults: CapabilityMap,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new(builtin_defaults())
    }
}

fn builtin_defaults() -> CapabilityMap {
    CapabilityMap::from_entries(
        defaults::RESOLUTIONS
            .iter()
            .map(|&size| (Resolution::from(size), defaults::FRAMERATES.to_vec())),
    )
}

impl Negotiator {
    /// Create with a custom fallback table; an empty table means the built-in one
    pub fn new(defaults: CapabilityMap) -> Self {
        let defaults = if defaults.is_empty() {
            warn!("Configured default capabilities are empty; using built-in table");
            builtin_defaults()
        } else {
            defaults
        };
        Self { defaults }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_capabilities())
    }

    /// Table used when a device reports nothing
    pub fn defaults(&self) -> &CapabilityMap {
        &self.defaults
    }

    /// Select the format to activate
    ///
    /// 1. An empty `capabilities` map is replaced by the default table.
    /// 2. The preferred resolution is kept if offered, otherwise the smallest
    ///    resolution by (width, height) is used.
    /// 3. The preferred fps is kept if that resolution offers it, otherwise
    ///    the lowest rate it offers is used.
    pub fn negotiate(
        &self,
        capabilities: &CapabilityMap,
        preferred_resolution: Option<&str>,
        preferred_fps: Option<u32>,
    ) -> Selection {
        let table = if capabilities.is_empty() {
            debug!("No capability data; using default table");
            &self.defaults
        } else {
            capabilities
        };

        let preferred = preferred_resolution
            .and_then(|label| label.trim().parse::<Resolution>().ok())
            .filter(|resolution| table.contains(resolution));

        let (resolution, rates) = match preferred {
            Some(resolution) => (resolution, table.framerates(&resolution).unwrap_or_default()),
            None => table.smallest().unwrap_or((
                Resolution::from(defaults::RESOLUTIONS[0]),
                &[framerates::FALLBACK_FPS][..],
            )),
        };

        let fps = preferred_fps
            .filter(|fps| rates.contains(fps))
            .or_else(|| rates.first().copied())
            .unwrap_or(framerates::FALLBACK_FPS);

        Selection { resolution, fps }
    }

    /// Negotiate against stored preferences and write the result back
    ///
    /// A failed write is logged; the selection is still returned.
    pub fn negotiate_with_store<S>(&self, capabilities: &CapabilityMap, store: &mut S) -> Selection
    where
        S: PreferenceStore + ?Sized,
    {
        let preferred_resolution = store.preferred_resolution();
        let preferred_fps = store.preferred_fps();

        let selection = self.negotiate(capabilities, preferred_resolution.as_deref(), preferred_fps);

        info!(
            selection = %selection,
            preferred_resolution = ?preferred_resolution,
            preferred_fps = ?preferred_fps,
            "Negotiated capture format"
        );

        if let Err(e) = store.set(keys::RESOLUTION, json!(selection.resolution.to_string())) {
            warn!(error = %e, "Failed to store resolution");
        }
        if let Err(e) = store.set(keys::FPS, json!(selection.fps)) {
            warn!(error = %e, "Failed to store fps");
        }

        selection
    }
}
