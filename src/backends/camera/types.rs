// SPDX-License-Identifier: GPL-3.0-only
// Shared types for capability discovery and negotiation

//! Shared types for camera backends

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Frame size in pixels
///
/// Ordered by width, then height, so the smallest entry of a capability map
/// is simply its first key. Displayed and parsed as `"WxH"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Error returned when a `"WxH"` label cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResolutionError(pub String);

impl std::fmt::Display for ParseResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid resolution label: {:?}", self.0)
    }
}

impl std::error::Error for ParseResolutionError {}

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseResolutionError(s.to_string());
        let (w, h) = s.split_once('x').ok_or_else(err)?;
        let width: u32 = w.parse().map_err(|_| err())?;
        let height: u32 = h.parse().map_err(|_| err())?;
        if width == 0 || height == 0 {
            return Err(err());
        }
        Ok(Self { width, height })
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// Supported frame rates per resolution
///
/// Every key maps to a non-empty, ascending, deduplicated list. The
/// constructors enforce this, so a map can be handed to the negotiator
/// without further checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityMap(BTreeMap<Resolution, Vec<u32>>);

impl CapabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from raw entries, sorting and deduplicating each fps list
    /// and dropping resolutions left without any frame rate
    pub fn from_entries<I, F>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Resolution, F)>,
        F: IntoIterator<Item = u32>,
    {
        let mut map: BTreeMap<Resolution, Vec<u32>> = BTreeMap::new();
        for (resolution, rates) in entries {
            map.entry(resolution).or_default().extend(rates);
        }
        map.retain(|_, rates| {
            rates.sort_unstable();
            rates.dedup();
            !rates.is_empty()
        });
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, resolution: &Resolution) -> bool {
        self.0.contains_key(resolution)
    }

    /// Frame rates for a resolution, ascending
    pub fn framerates(&self, resolution: &Resolution) -> Option<&[u32]> {
        self.0.get(resolution).map(Vec::as_slice)
    }

    /// Smallest resolution by (width, height) and its frame rates
    pub fn smallest(&self) -> Option<(Resolution, &[u32])> {
        self.0
            .iter()
            .next()
            .map(|(resolution, rates)| (*resolution, rates.as_slice()))
    }

    pub fn resolutions(&self) -> impl Iterator<Item = Resolution> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resolution, &[u32])> + '_ {
        self.0
            .iter()
            .map(|(resolution, rates)| (*resolution, rates.as_slice()))
    }
}

/// Continuous frame size range reported as `Size: Stepwise`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepwiseRect {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl StepwiseRect {
    /// Rectangle between two corners given in either order
    pub fn spanning(a: Resolution, b: Resolution) -> Self {
        Self {
            min_width: a.width.min(b.width),
            min_height: a.height.min(b.height),
            max_width: a.width.max(b.width),
            max_height: a.height.max(b.height),
        }
    }

    /// Inclusive on both bounds of both axes
    pub fn contains(&self, resolution: Resolution) -> bool {
        (self.min_width..=self.max_width).contains(&resolution.width)
            && (self.min_height..=self.max_height).contains(&resolution.height)
    }
}

/// Frame rate bounds derived from a stepwise interval description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpsRange {
    pub min: u32,
    pub max: u32,
}

impl FpsRange {
    pub fn contains(&self, fps: u32) -> bool {
        (self.min..=self.max).contains(&fps)
    }
}

/// Represents a capture device
///
/// Two descriptors are the same device when their paths match; the display
/// name is best-effort and may differ between enumerations.
#[derive(Debug, Clone, Eq)]
pub struct CameraDevice {
    pub path: String,
    pub name: String,
}

impl PartialEq for CameraDevice {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl std::fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}

/// Concrete format chosen by negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub resolution: Resolution,
    pub fps: u32,
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}fps", self.resolution, self.fps)
    }
}
