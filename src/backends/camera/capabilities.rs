// SPDX-License-Identifier: GPL-3.0-only

//! Capability text parsing
//!
//! Turns the text printed by `v4l2-ctl --list-formats-ext` into a
//! [`CapabilityMap`]. Devices describe their modes in one of two styles:
//!
//! ```text
//! Size: Discrete 1280x720                      Size: Stepwise 320x240 - 1920x1080
//!     Interval: Discrete 0.033s (30.000 fps)       Interval: Stepwise 0.017s - 0.067s
//! ```
//!
//! Discrete entries are taken as-is. A stepwise range has no concrete modes,
//! so candidates are synthesized from [`STANDARD_RESOLUTIONS`] and a fixed
//! set of common frame rates. When a dump contains both, discrete wins.
//!
//! Parsing is a single pass: each line is classified into a
//! [`CapabilityLine`] and applied to a [`ScanState`]. Lines that match no
//! known shape are ignored, so malformed output yields a partial (or empty)
//! map rather than an error.

use super::types::{CapabilityMap, FpsRange, Resolution, StepwiseRect};
use crate::constants::{STANDARD_RESOLUTIONS, framerates};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Tunables for capability parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Frame rates offered for stepwise devices, filtered to the reported range
    pub fps_candidates: Vec<u32>,
    /// Frame rate used for synthesized resolutions when the dump reports none
    pub fallback_fps: u32,
    /// Inclusive ceiling; rounded rates above this (or at zero) are dropped
    pub max_fps: u32,
    /// Candidate universe for stepwise synthesis
    pub standard_resolutions: Vec<Resolution>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            fps_candidates: framerates::STEPWISE_CANDIDATES.to_vec(),
            fallback_fps: framerates::FALLBACK_FPS,
            max_fps: framerates::MAX_FPS,
            standard_resolutions: STANDARD_RESOLUTIONS
                .iter()
                .copied()
                .map(Resolution::from)
                .collect(),
        }
    }
}

impl ParserConfig {
    /// Round a measured rate (halves to even) and keep it only if it lies in (0, max_fps]
    pub fn normalize_fps(&self, fps: f64) -> Option<u32> {
        let rounded = fps.round_ties_even();
        if rounded > 0.0 && rounded <= self.max_fps as f64 {
            Some(rounded as u32)
        } else {
            None
        }
    }
}

/// One recognized line of capability output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapabilityLine {
    /// `Size: Discrete 1280x720`
    DiscreteSize(Resolution),
    /// `Size: Stepwise 320x240 - 1920x1080 with step 8/8`
    StepwiseSize(StepwiseRect),
    /// `(30.000 fps)` anywhere on the line
    ApproxFps(f64),
    /// `Interval: Discrete 1/30` (seconds per frame as a fraction)
    IntervalFraction { numerator: u32, denominator: u32 },
    /// `Interval: Stepwise 0.017s - 0.067s`
    StepwiseInterval { min_seconds: f64, max_seconds: f64 },
}

impl CapabilityLine {
    /// Classify a line, trying each shape in priority order
    ///
    /// The order matters: `Interval: Discrete 0.033s (30.000 fps)` is an
    /// approximate-fps line, and `Size: Stepwise ... with step 1/1` must not
    /// be read as an interval fraction.
    pub fn classify(line: &str) -> Option<Self> {
        let line = line.trim();

        parse_discrete_size(line)
            .map(Self::DiscreteSize)
            .or_else(|| parse_stepwise_size(line).map(Self::StepwiseSize))
            .or_else(|| parse_approx_fps(line).map(Self::ApproxFps))
            .or_else(|| {
                parse_interval_fraction(line).map(|(numerator, denominator)| {
                    Self::IntervalFraction {
                        numerator,
                        denominator,
                    }
                })
            })
            .or_else(|| {
                parse_stepwise_interval(line).map(|(min_seconds, max_seconds)| {
                    Self::StepwiseInterval {
                        min_seconds,
                        max_seconds,
                    }
                })
            })
    }
}

fn parse_discrete_size(line: &str) -> Option<Resolution> {
    let rest = line.strip_prefix("Size: Discrete")?;
    rest.split_whitespace().next()?.parse().ok()
}

fn parse_stepwise_size(line: &str) -> Option<StepwiseRect> {
    let rest = line
        .strip_prefix("Size: Stepwise")
        .or_else(|| line.strip_prefix("Size: Continuous"))?;

    let mut tokens = rest.split_whitespace();
    let first: Resolution = tokens.next()?.parse().ok()?;
    if tokens.next()? != "-" {
        return None;
    }
    let second: Resolution = tokens.next()?.parse().ok()?;

    Some(StepwiseRect::spanning(first, second))
}

fn parse_approx_fps(line: &str) -> Option<f64> {
    let end = line.rfind(" fps)")?;
    let start = line[..end].rfind('(')?;
    line[start + 1..end].trim().parse().ok()
}

fn parse_interval_fraction(line: &str) -> Option<(u32, u32)> {
    let rest = line.strip_prefix("Interval: Discrete")?;
    let (numerator, denominator) = rest.split_whitespace().next()?.split_once('/')?;
    Some((numerator.parse().ok()?, denominator.parse().ok()?))
}

fn parse_stepwise_interval(line: &str) -> Option<(f64, f64)> {
    let rest = line
        .strip_prefix("Interval: Stepwise")
        .or_else(|| line.strip_prefix("Interval: Continuous"))?;

    let mut tokens = rest.split_whitespace();
    let first = parse_seconds(tokens.next()?)?;
    if tokens.next()? != "-" {
        return None;
    }
    let second = parse_seconds(tokens.next()?)?;

    Some((first.min(second), first.max(second)))
}

fn parse_seconds(token: &str) -> Option<f64> {
    let seconds: f64 = token.strip_suffix('s').unwrap_or(token).parse().ok()?;
    (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}

/// Parser state carried from one line to the next
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    current: Option<Resolution>,
    discrete: BTreeMap<Resolution, BTreeSet<u32>>,
    stepwise_rect: Option<StepwiseRect>,
    stepwise_fps: BTreeSet<u32>,
    stepwise_range: Option<FpsRange>,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolution that frame rate lines are currently attributed to
    pub fn current_resolution(&self) -> Option<Resolution> {
        self.current
    }

    pub fn stepwise_rect(&self) -> Option<StepwiseRect> {
        self.stepwise_rect
    }

    pub fn stepwise_range(&self) -> Option<FpsRange> {
        self.stepwise_range
    }

    /// Frame rates seen while no discrete resolution was active
    pub fn stepwise_fps(&self) -> &BTreeSet<u32> {
        &self.stepwise_fps
    }

    /// Apply one classified line
    pub fn apply(&mut self, line: CapabilityLine, config: &ParserConfig) {
        match line {
            CapabilityLine::DiscreteSize(resolution) => {
                self.current = Some(resolution);
                self.discrete.entry(resolution).or_default();
            }
            CapabilityLine::StepwiseSize(rect) => {
                self.stepwise_rect = Some(rect);
                self.current = None;
            }
            CapabilityLine::ApproxFps(fps) => {
                if let Some(fps) = config.normalize_fps(fps) {
                    self.attribute(fps);
                }
            }
            CapabilityLine::IntervalFraction {
                numerator,
                denominator,
            } => {
                if numerator > 0
                    && let Some(fps) = config.normalize_fps(denominator as f64 / numerator as f64)
                {
                    self.attribute(fps);
                }
            }
            CapabilityLine::StepwiseInterval {
                min_seconds,
                max_seconds,
            } => {
                // Longest frame time gives the lowest rate
                self.stepwise_range = Some(FpsRange {
                    min: (1.0 / max_seconds).round_ties_even() as u32,
                    max: (1.0 / min_seconds).round_ties_even() as u32,
                });
            }
        }
    }

    fn attribute(&mut self, fps: u32) {
        match self.current {
            Some(resolution) => {
                self.discrete.entry(resolution).or_default().insert(fps);
            }
            None => {
                self.stepwise_fps.insert(fps);
            }
        }
    }

    /// Produce the capability map for everything scanned so far
    pub fn finish(self, config: &ParserConfig) -> CapabilityMap {
        if self.discrete.values().any(|rates| !rates.is_empty()) {
            return CapabilityMap::from_entries(self.discrete);
        }

        let Some(rect) = self.stepwise_rect else {
            return CapabilityMap::new();
        };

        let rates: Vec<u32> = if let Some(range) = self.stepwise_range {
            config
                .fps_candidates
                .iter()
                .copied()
                .filter(|fps| range.contains(*fps) && *fps > 0 && *fps <= config.max_fps)
                .collect()
        } else if !self.stepwise_fps.is_empty() {
            self.stepwise_fps.into_iter().collect()
        } else {
            vec![config.fallback_fps]
        };

        debug!(
            min = %format!("{}x{}", rect.min_width, rect.min_height),
            max = %format!("{}x{}", rect.max_width, rect.max_height),
            ?rates,
            "Synthesizing capabilities from stepwise range"
        );

        CapabilityMap::from_entries(
            config
                .standard_resolutions
                .iter()
                .copied()
                .filter(|resolution| rect.contains(*resolution))
                .map(|resolution| (resolution, rates.clone())),
        )
    }
}

/// Parse a full capability dump
pub fn parse_capabilities(text: &str, config: &ParserConfig) -> CapabilityMap {
    let mut state = ScanState::new();
    let mut matched = 0usize;

    for line in text.lines() {
        if let Some(classified) = CapabilityLine::classify(line) {
            state.apply(classified, config);
            matched += 1;
        }
    }

    let map = state.finish(config);
    debug!(
        lines = text.lines().count(),
        matched,
        resolutions = map.len(),
        "Parsed capability output"
    );
    map
}
