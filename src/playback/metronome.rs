//! Metronome accent pattern
//!
//! The first beat of every bar is accented; the rest are regular clicks.

use std::fmt;

use serde::Serialize;

use crate::timing::{Tempo, TimeSignature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickType {
    Accent,
    Regular,
}

impl ClickType {
    /// Output gain of the click
    pub fn gain_db(&self) -> f64 {
        match self {
            ClickType::Accent => -5.0,
            ClickType::Regular => -10.0,
        }
    }
}

impl fmt::Display for ClickType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClickType::Accent => write!(f, "accent"),
            ClickType::Regular => write!(f, "regular"),
        }
    }
}

/// One scheduled click
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Click {
    pub time_ms: f64,
    pub beat: u64,
    pub click_type: ClickType,
}

/// Endless beat counter that classifies each beat
///
/// # Example
/// ```
/// use tapgrid::playback::{ClickPattern, ClickType};
/// use tapgrid::timing::{Tempo, TimeSignature};
///
/// let waltz = TimeSignature::new(3, 4).unwrap();
/// let types: Vec<_> = ClickPattern::new(Tempo::new(120).unwrap(), waltz)
///     .take(4)
///     .map(|click| click.click_type)
///     .collect();
/// assert_eq!(types, [ClickType::Accent, ClickType::Regular, ClickType::Regular, ClickType::Accent]);
/// ```
#[derive(Debug, Clone)]
pub struct ClickPattern {
    beat_ms: f64,
    beats_per_bar: u32,
    beat: u64,
}

impl ClickPattern {
    pub fn new(tempo: Tempo, time_signature: TimeSignature) -> Self {
        Self {
            beat_ms: tempo.beat_ms(),
            beats_per_bar: time_signature.beats_per_bar(),
            beat: 0,
        }
    }

    /// Start counting from beat 0 again
    pub fn reset(&mut self) {
        self.beat = 0;
    }

    pub fn click_type(&self, beat: u64) -> ClickType {
        if beat % self.beats_per_bar as u64 == 0 {
            ClickType::Accent
        } else {
            ClickType::Regular
        }
    }
}

impl Iterator for ClickPattern {
    type Item = Click;

    fn next(&mut self) -> Option<Click> {
        let beat = self.beat;
        self.beat += 1;
        Some(Click {
            time_ms: beat as f64 * self.beat_ms,
            beat,
            click_type: self.click_type(beat),
        })
    }
}
