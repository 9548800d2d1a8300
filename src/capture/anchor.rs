//! Downbeat anchor validation
//!
//! Second tap pass: the user taps the "1" of each bar. Every tap after the
//! first must land within a tolerance window of where the bar grid implied
//! by the committed tempo puts it. A tap outside the window throws away the
//! whole pass.

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::AnchorConfig;
use crate::error::{Result, TapGridError};
use crate::timing::{Tempo, TimeSignature};

/// Where a rejected tap landed relative to the schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DriftReport {
    pub expected_ms: f64,
    pub actual_ms: f64,
    pub tolerance_ms: f64,
}

impl DriftReport {
    /// Signed distance of the tap from its expected time
    pub fn offset_ms(&self) -> f64 {
        self.actual_ms - self.expected_ms
    }
}

impl From<DriftReport> for TapGridError {
    fn from(report: DriftReport) -> Self {
        TapGridError::DriftExceeded {
            expected_ms: report.expected_ms,
            actual_ms: report.actual_ms,
            tolerance_ms: report.tolerance_ms,
        }
    }
}

/// Result of feeding one tap to the validator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnchorOutcome {
    /// The tap joined the validated sequence
    pub accepted: bool,
    /// Trusted downbeat, once the pass is complete
    pub anchor: Option<f64>,
    /// The tap drifted and the sequence was discarded
    pub reset_occurred: bool,
    /// Length of the validated sequence after this tap
    pub valid_taps: usize,
    /// Details of the drift when a reset occurred
    pub drift: Option<DriftReport>,
}

/// Validates downbeat taps against the bar schedule of a committed tempo
#[derive(Debug, Clone)]
pub struct AnchorValidator {
    config: AnchorConfig,
    bar_ms: f64,
    tolerance_ms: f64,
    valid_taps: Vec<f64>,
}

impl AnchorValidator {
    /// Create a validator for the given tempo and time signature
    pub fn new(tempo: Tempo, time_signature: TimeSignature, config: AnchorConfig) -> Self {
        let bar_ms = tempo.bar_ms(&time_signature);
        Self {
            config,
            bar_ms,
            tolerance_ms: bar_ms / config.tolerance_divisor,
            valid_taps: Vec::with_capacity(config.required_taps),
        }
    }

    /// Feed one downbeat tap
    ///
    /// # Example
    /// ```
    /// use tapgrid::capture::AnchorValidator;
    /// use tapgrid::config::AnchorConfig;
    /// use tapgrid::timing::{Tempo, TimeSignature};
    ///
    /// let tempo = Tempo::new(120).unwrap();
    /// let mut validator =
    ///     AnchorValidator::new(tempo, TimeSignature::FOUR_FOUR, AnchorConfig::default());
    /// validator.tap(1000.0);
    /// let outcome = validator.tap(3200.0); // 200 ms late, tolerance is 125 ms
    /// assert!(outcome.reset_occurred);
    /// ```
    pub fn tap(&mut self, timestamp_ms: f64) -> AnchorOutcome {
        if self.is_complete() {
            debug!("[ANCHOR] Pass complete, ignoring tap at {:.1} ms", timestamp_ms);
            return self.outcome(false, None);
        }

        let Some(&first) = self.valid_taps.first() else {
            self.valid_taps.push(timestamp_ms);
            debug!("[ANCHOR] First downbeat at {:.1} ms", timestamp_ms);
            return self.outcome(true, None);
        };

        let expected = first + self.valid_taps.len() as f64 * self.bar_ms;
        if (timestamp_ms - expected).abs() <= self.tolerance_ms {
            self.valid_taps.push(timestamp_ms);
            debug!(
                "[ANCHOR] Downbeat {}/{} at {:.1} ms (expected {:.1} ms)",
                self.valid_taps.len(),
                self.config.required_taps,
                timestamp_ms,
                expected
            );
            if let Some(anchor) = self.anchor() {
                info!("[ANCHOR] Validated anchor at {:.1} ms", anchor);
            }
            return self.outcome(true, None);
        }

        let drift = DriftReport {
            expected_ms: expected,
            actual_ms: timestamp_ms,
            tolerance_ms: self.tolerance_ms,
        };
        warn!(
            "[ANCHOR] Tap at {:.1} ms is {:+.1} ms off the bar grid, restarting pass",
            timestamp_ms,
            drift.offset_ms()
        );
        self.valid_taps.clear();
        self.outcome(false, Some(drift))
    }

    fn outcome(&self, accepted: bool, drift: Option<DriftReport>) -> AnchorOutcome {
        AnchorOutcome {
            accepted,
            anchor: self.anchor(),
            reset_occurred: drift.is_some(),
            valid_taps: self.valid_taps.len(),
            drift,
        }
    }

    /// The anchor, once enough aligned taps were collected
    pub fn anchor(&self) -> Option<f64> {
        if self.is_complete() {
            self.valid_taps.get(self.config.anchor_tap_index).copied()
        } else {
            None
        }
    }

    /// Return the anchor or report how many taps are still missing
    pub fn finalize(&self) -> Result<f64> {
        self.anchor().ok_or(TapGridError::InsufficientTaps {
            required: self.config.required_taps,
            got: self.valid_taps.len(),
        })
    }

    /// True once the required number of aligned taps is reached
    pub fn is_complete(&self) -> bool {
        self.valid_taps.len() >= self.config.required_taps
    }

    /// Taps accepted in the current pass
    pub fn valid_taps(&self) -> &[f64] {
        &self.valid_taps
    }

    /// Bar length used for the schedule
    pub fn bar_ms(&self) -> f64 {
        self.bar_ms
    }

    /// Allowed distance from the expected time
    pub fn tolerance_ms(&self) -> f64 {
        self.tolerance_ms
    }

    /// Start the pass over
    pub fn reset(&mut self) {
        self.valid_taps.clear();
    }
}
