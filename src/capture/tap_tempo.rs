//! Tap-tempo estimation
//!
//! Turns a growing list of key-press timestamps into a BPM estimate and a
//! stability verdict. Intervals outside the plausible human band (double
//! triggers, long pauses) are ignored rather than reset the history.
//!
//! Timestamps must be non-decreasing; the estimator does not reorder or
//! reject them.

use log::debug;
use serde::Serialize;

use crate::config::TapTempoConfig;
use crate::error::{Result, TapGridError};
use crate::timing::tempo::MS_PER_MINUTE;
use crate::timing::Tempo;

/// Snapshot of the estimator after a tap
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempoEstimate {
    /// Rounded BPM, `None` until a plausible interval exists
    pub bpm: Option<u32>,
    /// True once enough intervals agree closely enough
    pub stable: bool,
    /// Number of intervals inside the plausible band
    pub interval_count: usize,
    /// Largest distance of a filtered interval from the mean
    pub max_deviation_ms: Option<f64>,
}

impl TempoEstimate {
    fn empty() -> Self {
        Self {
            bpm: None,
            stable: false,
            interval_count: 0,
            max_deviation_ms: None,
        }
    }
}

/// Estimates tempo from one capture session's taps
#[derive(Debug, Clone, Default)]
pub struct TapTempoEstimator {
    config: TapTempoConfig,
    taps: Vec<f64>,
}

impl TapTempoEstimator {
    /// Create an estimator with the given thresholds
    pub fn new(config: TapTempoConfig) -> Self {
        Self {
            config,
            taps: Vec::new(),
        }
    }

    /// Record a tap and return the updated estimate
    ///
    /// # Example
    /// ```
    /// use tapgrid::capture::TapTempoEstimator;
    /// let mut estimator = TapTempoEstimator::default();
    /// assert_eq!(estimator.tap(0.0).bpm, None);
    /// assert_eq!(estimator.tap(500.0).bpm, Some(120));
    /// ```
    pub fn tap(&mut self, timestamp_ms: f64) -> TempoEstimate {
        self.taps.push(timestamp_ms);
        let estimate = self.estimate();
        debug!(
            "[TAP] #{} at {:.1} ms -> {:?} BPM (stable: {})",
            self.taps.len(),
            timestamp_ms,
            estimate.bpm,
            estimate.stable
        );
        estimate
    }

    /// Evaluate the current history without adding a tap
    pub fn estimate(&self) -> TempoEstimate {
        let intervals = self.intervals();
        if intervals.is_empty() {
            return TempoEstimate::empty();
        }

        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let max_deviation = intervals
            .iter()
            .map(|interval| (interval - mean).abs())
            .fold(0.0_f64, f64::max);

        let stable = intervals.len() >= self.config.min_stable_intervals
            && max_deviation < self.config.max_deviation_ms;

        TempoEstimate {
            bpm: Some((MS_PER_MINUTE / mean).round() as u32),
            stable,
            interval_count: intervals.len(),
            max_deviation_ms: Some(max_deviation),
        }
    }

    /// Consecutive tap intervals that fall inside the plausible band
    pub fn intervals(&self) -> Vec<f64> {
        let min = self.config.min_interval_ms;
        let max = self.config.max_interval_ms;

        self.taps
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|&interval| interval > min && interval < max)
            .collect()
    }

    /// Commit the estimate as a tempo once it is stable
    ///
    /// Failing to commit leaves the history intact so tapping can continue.
    pub fn commit(&self) -> Result<Tempo> {
        let estimate = self.estimate();

        if estimate.interval_count < self.config.min_stable_intervals {
            return Err(TapGridError::InsufficientTaps {
                required: self.config.min_stable_intervals + 1,
                got: self.taps.len(),
            });
        }

        match estimate.bpm {
            Some(bpm) if estimate.stable => Tempo::new(bpm),
            _ => Err(TapGridError::UnstableTempo {
                deviation_ms: estimate.max_deviation_ms.unwrap_or(f64::INFINITY),
                limit_ms: self.config.max_deviation_ms,
            }),
        }
    }

    /// Number of taps recorded, including ones outside the band
    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    /// Thresholds in use
    pub fn config(&self) -> &TapTempoConfig {
        &self.config
    }

    /// Discard the tap history
    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tap_all(estimator: &mut TapTempoEstimator, taps: &[f64]) -> TempoEstimate {
        let mut last = TempoEstimate::empty();
        for &t in taps {
            last = estimator.tap(t);
        }
        last
    }

    fn regular(count: usize, interval: f64) -> Vec<f64> {
        (0..count).map(|i| i as f64 * interval).collect()
    }

    #[test]
    fn test_no_bpm_before_two_taps() {
        let mut estimator = TapTempoEstimator::default();
        let estimate = estimator.tap(1234.0);
        assert_eq!(estimate.bpm, None);
        assert!(!estimate.stable);
    }

    #[test]
    fn test_regular_taps_converge_and_stabilise() {
        let mut estimator = TapTempoEstimator::default();
        let taps = regular(25, 500.0);

        for (i, &t) in taps.iter().enumerate() {
            let estimate = estimator.tap(t);
            if i >= 1 {
                assert_eq!(estimate.bpm, Some(120));
            }
            // 20 intervals need 21 taps
            assert_eq!(estimate.stable, i >= 20, "tap {}", i);
        }

        assert_eq!(estimator.commit().unwrap().bpm(), 120);
    }

    #[test]
    fn test_long_pause_is_excluded() {
        let mut estimator = TapTempoEstimator::default();
        let mut taps = regular(5, 500.0);
        let resume = taps[4] + 3000.0;
        taps.extend((0..5).map(|i| resume + i as f64 * 500.0));

        let estimate = tap_all(&mut estimator, &taps);
        assert_eq!(estimate.bpm, Some(120));
        assert_eq!(estimate.interval_count, 8);
        assert_relative_eq!(estimate.max_deviation_ms.unwrap(), 0.0);
    }

    #[test]
    fn test_double_trigger_is_excluded() {
        let mut estimator = TapTempoEstimator::default();
        let estimate = tap_all(&mut estimator, &[0.0, 600.0, 650.0, 1250.0]);
        // 50 ms is a double trigger; 600 ms intervals remain
        assert_eq!(estimator.intervals(), vec![600.0, 600.0]);
        assert_eq!(estimate.bpm, Some(100));
    }

    #[test]
    fn test_band_edges_are_exclusive() {
        let mut estimator = TapTempoEstimator::default();
        let estimate = tap_all(&mut estimator, &[0.0, 200.0, 2200.0]);
        assert_eq!(estimate.bpm, None);
        assert!(estimator.intervals().is_empty());
    }

    #[test]
    fn test_jittery_taps_are_not_stable() {
        let mut estimator = TapTempoEstimator::default();
        let mut t = 0.0;
        estimator.tap(t);
        for i in 0..24 {
            t += if i % 2 == 0 { 440.0 } else { 560.0 };
            estimator.tap(t);
        }

        let estimate = estimator.estimate();
        assert_eq!(estimate.bpm, Some(120));
        assert!(!estimate.stable);
        assert!(matches!(
            estimator.commit(),
            Err(TapGridError::UnstableTempo { .. })
        ));
    }

    #[test]
    fn test_commit_too_early_keeps_history() {
        let mut estimator = TapTempoEstimator::default();
        tap_all(&mut estimator, &regular(6, 500.0));

        match estimator.commit() {
            Err(TapGridError::InsufficientTaps { required, got }) => {
                assert_eq!(required, 21);
                assert_eq!(got, 6);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(estimator.tap_count(), 6);
    }

    #[test]
    fn test_custom_threshold() {
        let config = TapTempoConfig {
            min_stable_intervals: 3,
            ..TapTempoConfig::default()
        };
        let mut estimator = TapTempoEstimator::new(config);
        let estimate = tap_all(&mut estimator, &regular(4, 750.0));
        assert!(estimate.stable);
        assert_eq!(estimate.bpm, Some(80));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut estimator = TapTempoEstimator::default();
        tap_all(&mut estimator, &regular(4, 500.0));
        estimator.reset();
        assert_eq!(estimator.tap_count(), 0);
        assert_eq!(estimator.estimate().bpm, None);
    }
}
