//! Time signature (beats per bar / beat unit)
//!
//! Only `beats_per_bar` enters the timing math; `beat_unit` is kept for
//! display and persistence. Persisted as the string `"N/M"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TapGridError};

/// Time signature, e.g. 4/4 = `TimeSignature { beats_per_bar: 4, beat_unit: 4 }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSignature {
    beats_per_bar: u32,
    beat_unit: u32,
}

impl TimeSignature {
    /// Signatures offered when picking the bar length
    pub const PRESETS: [TimeSignature; 4] = [
        TimeSignature::FOUR_FOUR,
        TimeSignature {
            beats_per_bar: 3,
            beat_unit: 4,
        },
        TimeSignature {
            beats_per_bar: 6,
            beat_unit: 8,
        },
        TimeSignature {
            beats_per_bar: 2,
            beat_unit: 4,
        },
    ];

    /// Common 4/4 time
    pub const FOUR_FOUR: TimeSignature = TimeSignature {
        beats_per_bar: 4,
        beat_unit: 4,
    };

    /// Create a time signature; both parts must be positive
    pub fn new(beats_per_bar: u32, beat_unit: u32) -> Result<Self> {
        if beats_per_bar == 0 || beat_unit == 0 {
            return Err(TapGridError::InvalidTimeSignature {
                value: format!("{}/{}", beats_per_bar, beat_unit),
            });
        }
        Ok(Self {
            beats_per_bar,
            beat_unit,
        })
    }

    /// Number of beats (and cursor subdivisions) in one bar
    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// Note value of one beat
    pub fn beat_unit(&self) -> u32 {
        self.beat_unit
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::FOUR_FOUR
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_bar, self.beat_unit)
    }
}

impl FromStr for TimeSignature {
    type Err = TapGridError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TapGridError::InvalidTimeSignature {
            value: s.to_string(),
        };

        let (beats, unit) = s.trim().split_once('/').ok_or_else(invalid)?;
        let beats_per_bar = beats.trim().parse::<u32>().map_err(|_| invalid())?;
        let beat_unit = unit.trim().parse::<u32>().map_err(|_| invalid())?;

        Self::new(beats_per_bar, beat_unit).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeSignature {
    type Error = TapGridError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeSignature> for String {
    fn from(ts: TimeSignature) -> Self {
        ts.to_string()
    }
}
