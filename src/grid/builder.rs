//! Bar grid construction
//!
//! Tiles a validated downbeat across the whole recording: backward to the
//! start of the audio, forward to its end.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::timing::{Tempo, TimeSignature};

/// Largest grid the builder will produce
pub const MAX_GRID_BARS: usize = 1_000_000;

/// What to do with the stretch of audio before the first tiled bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadingBarPolicy {
    /// Add a partial bar starting at 0 when more than half a bar precedes
    /// the first tiled bar (covers a pickup or lead-in)
    #[default]
    PickupBar,
    /// Leave the lead-in outside the grid
    None,
}

/// Ordered bar-start times for one recording
#[derive(Debug, Clone, PartialEq)]
pub struct BarGrid {
    bars: Vec<f64>,
    bar_ms: f64,
    time_signature: TimeSignature,
}

impl BarGrid {
    /// Rebuild a grid from persisted bar starts
    pub fn from_parts(bars: Vec<f64>, tempo: Tempo, time_signature: TimeSignature) -> Self {
        Self {
            bars,
            bar_ms: tempo.bar_ms(&time_signature),
            time_signature,
        }
    }

    fn empty(time_signature: TimeSignature) -> Self {
        Self {
            bars: Vec::new(),
            bar_ms: 0.0,
            time_signature,
        }
    }

    /// Bar-start times in milliseconds
    pub fn bars(&self) -> &[f64] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Nominal bar length; the leading pickup bar may be shorter
    pub fn bar_ms(&self) -> f64 {
        self.bar_ms
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    /// End of bar `index`: the next bar's start, or `fallback_ms` past
    /// the start for the last bar
    pub fn bar_end(&self, index: usize, fallback_ms: f64) -> Option<f64> {
        bar_end(&self.bars, index, fallback_ms)
    }

    pub fn into_bars(self) -> Vec<f64> {
        self.bars
    }
}

pub(crate) fn bar_end(bars: &[f64], index: usize, fallback_ms: f64) -> Option<f64> {
    let start = *bars.get(index)?;
    Some(bars.get(index + 1).copied().unwrap_or(start + fallback_ms))
}

/// Tile bars from `anchor_ms` across `[0, duration_ms)`
///
/// Degenerate input (a BPM outside `1..=MAX_BPM`, non-positive duration, an
/// anchor outside the audio, more than [`MAX_GRID_BARS`] bars) yields an
/// empty grid rather than an error.
///
/// # Example
/// ```
/// use tapgrid::grid::{build_bar_grid, LeadingBarPolicy};
/// use tapgrid::timing::TimeSignature;
///
/// let grid = build_bar_grid(1000.0, 120, TimeSignature::FOUR_FOUR, 5000.0, LeadingBarPolicy::PickupBar);
/// assert_eq!(grid.bars(), &[1000.0, 3000.0]);
/// ```
pub fn build_bar_grid(
    anchor_ms: f64,
    bpm: u32,
    time_signature: TimeSignature,
    duration_ms: f64,
    leading_bar: LeadingBarPolicy,
) -> BarGrid {
    let Ok(tempo) = Tempo::new(bpm) else {
        debug!("[GRID] No tempo, returning empty grid");
        return BarGrid::empty(time_signature);
    };

    if !(duration_ms > 0.0) || !anchor_ms.is_finite() || anchor_ms < 0.0 || anchor_ms >= duration_ms
    {
        debug!(
            "[GRID] Degenerate input (anchor {:.1} ms, duration {:.1} ms), returning empty grid",
            anchor_ms, duration_ms
        );
        return BarGrid::empty(time_signature);
    }

    let bar_ms = tempo.bar_ms(&time_signature);
    if duration_ms / bar_ms > MAX_GRID_BARS as f64 {
        debug!(
            "[GRID] {:.1} ms holds more than {} bars of {:.1} ms, returning empty grid",
            duration_ms, MAX_GRID_BARS, bar_ms
        );
        return BarGrid::empty(time_signature);
    }

    // Bars are offsets k * bar_ms from the anchor, so repeated builds agree bit for bit
    let backward = (1..)
        .map(|k| anchor_ms - k as f64 * bar_ms)
        .take_while(|&t| t > 0.0);
    let mut bars: Vec<f64> = backward.collect();
    bars.reverse();

    bars.push(anchor_ms);
    bars.extend(
        (1..)
            .map(|k| anchor_ms + k as f64 * bar_ms)
            .take_while(|&t| t < duration_ms),
    );

    if leading_bar == LeadingBarPolicy::PickupBar && bars[0] > bar_ms * 0.5 {
        let pickup = (bars[0] - bar_ms).max(0.0);
        debug!(
            "[GRID] Lead-in of {:.1} ms before first bar, adding pickup bar at {:.1} ms",
            bars[0], pickup
        );
        bars.insert(0, pickup);
    }

    info!(
        "[GRID] Built {} bars at {} {} over {:.1} ms",
        bars.len(),
        tempo,
        time_signature,
        duration_ms
    );

    BarGrid {
        bars,
        bar_ms,
        time_signature,
    }
}
