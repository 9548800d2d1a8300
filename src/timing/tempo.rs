//! Tempo in whole BPM

use std::fmt;

use serde::{Deserialize, Serialize};

use super::TimeSignature;
use crate::error::{Result, TapGridError};

/// Milliseconds in one minute
pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Fastest tempo accepted; anything above is a typo or a bad tap stream
pub const MAX_BPM: u32 = 1000;

/// Committed tempo, an integer BPM in `1..=MAX_BPM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Tempo {
    bpm: u32,
}

impl Tempo {
    /// Create a tempo; zero and anything above [`MAX_BPM`] are rejected
    pub fn new(bpm: u32) -> Result<Self> {
        if bpm == 0 || bpm > MAX_BPM {
            return Err(TapGridError::InvalidTempo { bpm });
        }
        Ok(Self { bpm })
    }

    /// Get BPM value
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Duration of one beat in milliseconds
    pub fn beat_ms(&self) -> f64 {
        MS_PER_MINUTE / self.bpm as f64
    }

    /// Duration of one bar in milliseconds
    pub fn bar_ms(&self, time_signature: &TimeSignature) -> f64 {
        self.beat_ms() * time_signature.beats_per_bar() as f64
    }
}

impl TryFrom<u32> for Tempo {
    type Error = TapGridError;

    fn try_from(bpm: u32) -> Result<Self> {
        Self::new(bpm)
    }
}

impl From<Tempo> for u32 {
    fn from(tempo: Tempo) -> Self {
        tempo.bpm
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}
