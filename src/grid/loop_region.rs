//! Loop regions
//!
//! A loop is a contiguous span of bars. `LoopSelection` models the way the
//! span is picked by clicking bars and toggled on and off during playback.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TapGridError};

/// Inclusive span of bars that playback repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRegion {
    start_bar: usize,
    end_bar: usize,
}

impl LoopRegion {
    /// Create a region; `start_bar` must not come after `end_bar`
    pub fn new(start_bar: usize, end_bar: usize) -> Result<Self> {
        if start_bar > end_bar {
            return Err(TapGridError::InvalidLoopRegion {
                start: start_bar,
                end: end_bar,
                reason: "start comes after end".to_string(),
            });
        }
        Ok(Self { start_bar, end_bar })
    }

    pub fn start_bar(&self) -> usize {
        self.start_bar
    }

    pub fn end_bar(&self) -> usize {
        self.end_bar
    }

    /// Number of bars in the loop
    pub fn bar_count(&self) -> usize {
        self.end_bar - self.start_bar + 1
    }

    pub fn contains(&self, bar_index: usize) -> bool {
        (self.start_bar..=self.end_bar).contains(&bar_index)
    }

    /// Check both ends against a grid of `bar_count` bars
    pub fn check_within(&self, bar_count: usize) -> Result<()> {
        if self.end_bar >= bar_count {
            return Err(TapGridError::InvalidLoopRegion {
                start: self.start_bar,
                end: self.end_bar,
                reason: format!("grid has {} bars", bar_count),
            });
        }
        Ok(())
    }
}

/// Click-driven loop selection
///
/// - the first click picks a single-bar loop
/// - while the end is pending, a click at or after the start sets the end
/// - a click before the start, or any click once both ends are set,
///   starts a new selection at that bar with the end pending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSelection {
    start: Option<usize>,
    end: Option<usize>,
    active: bool,
}

impl LoopSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a click on bar `index`
    pub fn click(&mut self, index: usize) {
        match (self.start, self.end) {
            (None, _) => {
                self.start = Some(index);
                self.end = Some(index);
            }
            (Some(start), None) if index >= start => {
                self.end = Some(index);
            }
            _ => {
                self.start = Some(index);
                self.end = None;
            }
        }

        if self.end.is_none() {
            // An incomplete selection cannot stay looping
            self.active = false;
        }

        debug!(
            "[LOOP] Click on bar {} -> start {:?}, end {:?}",
            index, self.start, self.end
        );
    }

    /// The selected span, once both ends are set
    pub fn region(&self) -> Option<LoopRegion> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => LoopRegion::new(start, end).ok(),
            _ => None,
        }
    }

    /// The span playback should honour right now
    pub fn active_region(&self) -> Option<LoopRegion> {
        if self.active {
            self.region()
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Switch looping on or off; only possible with a complete selection
    ///
    /// Returns the new active flag.
    pub fn toggle_active(&mut self) -> bool {
        if self.region().is_some() {
            self.active = !self.active;
            debug!("[LOOP] Looping {}", if self.active { "on" } else { "off" });
        }
        self.active
    }

    /// Forget the selection and stop looping
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether bar `index` is inside the selected span (for highlighting)
    pub fn contains(&self, index: usize) -> bool {
        self.region().is_some_and(|region| region.contains(index))
    }
}
