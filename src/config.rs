//! Engine configuration
//!
//! The thresholds below are tuning heuristics, not fixed rules of music.
//! A JSON file only needs the fields it overrides; everything else keeps
//! its default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TapGridError};
use crate::grid::LeadingBarPolicy;
use crate::playback::IntervalPolicy;

/// Default lower bound of the plausible tap interval band (exclusive).
pub const DEFAULT_MIN_INTERVAL_MS: f64 = 200.0;

/// Default upper bound of the plausible tap interval band (exclusive).
pub const DEFAULT_MAX_INTERVAL_MS: f64 = 2000.0;

/// Default number of filtered intervals before stability is judged.
pub const DEFAULT_MIN_STABLE_INTERVALS: usize = 20;

/// Default largest deviation from the mean that still counts as stable.
pub const DEFAULT_MAX_DEVIATION_MS: f64 = 50.0;

/// Default number of aligned downbeat taps.
pub const DEFAULT_REQUIRED_ANCHOR_TAPS: usize = 5;

/// Default tolerance divisor: one sixteenth of a bar.
pub const DEFAULT_TOLERANCE_DIVISOR: f64 = 16.0;

/// Default anchor pick: the third of five taps.
pub const DEFAULT_ANCHOR_TAP_INDEX: usize = 2;

/// Default duration assumed for the last bar when it has no successor.
pub const DEFAULT_FALLBACK_BAR_MS: f64 = 4000.0;

/// Tap-tempo estimation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapTempoConfig {
    /// Intervals at or below this are treated as double triggers.
    pub min_interval_ms: f64,
    /// Intervals at or above this are treated as pauses.
    pub max_interval_ms: f64,
    /// Filtered intervals required before a stability verdict.
    pub min_stable_intervals: usize,
    /// Stability holds while every interval is closer than this to the mean.
    pub max_deviation_ms: f64,
}

impl Default for TapTempoConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
            min_stable_intervals: DEFAULT_MIN_STABLE_INTERVALS,
            max_deviation_ms: DEFAULT_MAX_DEVIATION_MS,
        }
    }
}

/// Downbeat validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Aligned taps needed to complete validation.
    pub required_taps: usize,
    /// Tolerance is one bar divided by this.
    pub tolerance_divisor: f64,
    /// Which validated tap becomes the anchor.
    pub anchor_tap_index: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            required_taps: DEFAULT_REQUIRED_ANCHOR_TAPS,
            tolerance_divisor: DEFAULT_TOLERANCE_DIVISOR,
            anchor_tap_index: DEFAULT_ANCHOR_TAP_INDEX,
        }
    }
}

/// Bar grid and position mapping settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub leading_bar: LeadingBarPolicy,
    /// Length assumed for the last bar.
    pub fallback_bar_ms: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            leading_bar: LeadingBarPolicy::default(),
            fallback_bar_ms: DEFAULT_FALLBACK_BAR_MS,
        }
    }
}

/// Playback polling settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub interval: IntervalPolicy,
}

/// Complete engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tap_tempo: TapTempoConfig,
    pub anchor: AnchorConfig,
    pub grid: GridConfig,
    pub playback: PlaybackConfig,
}

impl EngineConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| TapGridError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(TapGridError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        let tap = &self.tap_tempo;
        if !(tap.min_interval_ms >= 0.0 && tap.min_interval_ms < tap.max_interval_ms) {
            return invalid("tap interval band is empty");
        }
        if tap.min_stable_intervals == 0 {
            return invalid("min_stable_intervals must be at least 1");
        }
        if !(tap.max_deviation_ms > 0.0) {
            return invalid("max_deviation_ms must be positive");
        }

        let anchor = &self.anchor;
        if anchor.required_taps == 0 {
            return invalid("required_taps must be at least 1");
        }
        if anchor.anchor_tap_index >= anchor.required_taps {
            return invalid("anchor_tap_index must point inside the required taps");
        }
        if !(anchor.tolerance_divisor > 0.0) {
            return invalid("tolerance_divisor must be positive");
        }

        if !(self.grid.fallback_bar_ms > 0.0) {
            return invalid("fallback_bar_ms must be positive");
        }

        if let IntervalPolicy::FixedMs(0) = self.playback.interval {
            return invalid("polling interval must be positive");
        }

        Ok(())
    }
}
