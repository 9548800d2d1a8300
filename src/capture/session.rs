//! Capture Session State Machine
//!
//! Drives one pass from an empty tap history to a finished bar grid:
//!
//! ```text
//! Idle -> CapturingTempo -> Stable -> CapturingAnchor -> AnchorValidated -> GridReady
//! ```
//!
//! Stability and anchor completion advance the session on their own; the
//! other transitions are explicit calls guarded by the current state.

use std::fmt;

use log::{debug, info, warn};

use super::anchor::{AnchorOutcome, AnchorValidator};
use super::tap_tempo::{TapTempoEstimator, TempoEstimate};
use crate::config::EngineConfig;
use crate::error::{Result, TapGridError};
use crate::grid::{build_bar_grid, BarGrid};
use crate::timing::{Tempo, TimeSignature};

/// Where a capture session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing captured yet
    #[default]
    Idle,
    /// Collecting tempo taps
    CapturingTempo,
    /// Tempo taps agree; the tempo can be committed
    Stable,
    /// Collecting downbeat taps against the committed tempo
    CapturingAnchor,
    /// A downbeat anchor was validated
    AnchorValidated,
    /// The bar grid is built
    GridReady,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::CapturingTempo => write!(f, "CapturingTempo"),
            SessionState::Stable => write!(f, "Stable"),
            SessionState::CapturingAnchor => write!(f, "CapturingAnchor"),
            SessionState::AnchorValidated => write!(f, "AnchorValidated"),
            SessionState::GridReady => write!(f, "GridReady"),
        }
    }
}

/// What a tap did, depending on which pass received it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapResponse {
    Tempo(TempoEstimate),
    Anchor(AnchorOutcome),
}

/// One capture session, owned by whatever drives the key presses
#[derive(Debug, Clone)]
pub struct CaptureSession {
    config: EngineConfig,
    state: SessionState,
    estimator: TapTempoEstimator,
    tempo: Option<Tempo>,
    time_signature: TimeSignature,
    validator: Option<AnchorValidator>,
    anchor: Option<f64>,
    grid: Option<BarGrid>,
    grid_generation: u64,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl CaptureSession {
    /// Create an idle session, rejecting a config that could never finish
    /// a pass
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: EngineConfig) -> Self {
        Self {
            estimator: TapTempoEstimator::new(config.tap_tempo),
            config,
            state: SessionState::Idle,
            tempo: None,
            time_signature: TimeSignature::default(),
            validator: None,
            anchor: None,
            grid: None,
            grid_generation: 0,
        }
    }

    fn invalid(&self, event: &str) -> TapGridError {
        warn!("[SESSION] Rejected '{}' in state {}", event, self.state);
        TapGridError::InvalidTransition {
            from: self.state.to_string(),
            event: event.to_string(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("[SESSION] {} -> {}", self.state, next);
            self.state = next;
        }
    }

    // ========================================================================
    // Tempo Pass
    // ========================================================================

    /// Begin the tempo pass
    ///
    /// State transition: Idle -> CapturingTempo
    pub fn start_tempo(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle => {
                self.estimator.reset();
                self.transition(SessionState::CapturingTempo);
                Ok(())
            }
            _ => Err(self.invalid("start tempo capture")),
        }
    }

    /// Feed a key press to whichever pass is running
    ///
    /// # Example
    /// ```
    /// use tapgrid::capture::{CaptureSession, SessionState};
    ///
    /// let mut session = CaptureSession::default();
    /// session.start_tempo().unwrap();
    /// for i in 0..21 {
    ///     session.tap(i as f64 * 500.0).unwrap();
    /// }
    /// assert_eq!(session.state(), SessionState::Stable);
    /// ```
    pub fn tap(&mut self, timestamp_ms: f64) -> Result<TapResponse> {
        match self.state {
            SessionState::CapturingTempo | SessionState::Stable => {
                let estimate = self.estimator.tap(timestamp_ms);
                // Committing freezes the tempo; later taps only refine the estimate
                if self.tempo.is_none() {
                    let next = if estimate.stable {
                        SessionState::Stable
                    } else {
                        SessionState::CapturingTempo
                    };
                    self.transition(next);
                }
                Ok(TapResponse::Tempo(estimate))
            }
            SessionState::CapturingAnchor => {
                let validator = self
                    .validator
                    .as_mut()
                    .ok_or(TapGridError::TempoMissing)?;
                let outcome = validator.tap(timestamp_ms);
                if let Some(anchor) = outcome.anchor {
                    self.anchor = Some(anchor);
                    self.transition(SessionState::AnchorValidated);
                }
                Ok(TapResponse::Anchor(outcome))
            }
            _ => Err(self.invalid("tap")),
        }
    }

    /// Latest tempo estimate
    pub fn tempo_estimate(&self) -> TempoEstimate {
        self.estimator.estimate()
    }

    /// Commit the tempo
    ///
    /// Before stability this reports what is missing and keeps the taps.
    pub fn commit_tempo(&mut self) -> Result<Tempo> {
        match self.state {
            SessionState::CapturingTempo | SessionState::Stable => {
                let tempo = self.estimator.commit()?;
                info!("[SESSION] Tempo committed: {}", tempo);
                self.tempo = Some(tempo);
                self.transition(SessionState::Stable);
                Ok(tempo)
            }
            _ => Err(self.invalid("commit tempo")),
        }
    }

    // ========================================================================
    // Anchor Pass
    // ========================================================================

    /// Begin (or restart) the downbeat pass
    ///
    /// State transitions: Stable | CapturingAnchor | AnchorValidated -> CapturingAnchor
    pub fn start_anchor(&mut self, time_signature: TimeSignature) -> Result<()> {
        let tempo = self.tempo.ok_or(TapGridError::TempoMissing)?;

        match self.state {
            SessionState::Stable
            | SessionState::CapturingAnchor
            | SessionState::AnchorValidated => {
                self.time_signature = time_signature;
                self.validator = Some(AnchorValidator::new(
                    tempo,
                    time_signature,
                    self.config.anchor,
                ));
                self.anchor = None;
                self.transition(SessionState::CapturingAnchor);
                Ok(())
            }
            _ => Err(self.invalid("start anchor capture")),
        }
    }

    /// Return the validated anchor, or how many taps are still missing
    pub fn finalize_anchor(&self) -> Result<f64> {
        match self.state {
            SessionState::CapturingAnchor | SessionState::AnchorValidated => self
                .validator
                .as_ref()
                .ok_or(TapGridError::TempoMissing)?
                .finalize(),
            _ => self.anchor.ok_or_else(|| self.invalid("finalize anchor")),
        }
    }

    // ========================================================================
    // Grid
    // ========================================================================

    /// Build the bar grid over `duration_ms` of audio
    ///
    /// State transitions:
    /// - AnchorValidated | GridReady -> GridReady
    /// - AnchorValidated | GridReady -> AnchorValidated when no bar fits,
    ///   returning `EmptyBarSequence` so the build can be retried
    pub fn build_grid(&mut self, duration_ms: f64) -> Result<&BarGrid> {
        match self.state {
            SessionState::AnchorValidated | SessionState::GridReady => {}
            _ => {
                return Err(match self.tempo {
                    None => TapGridError::TempoMissing,
                    Some(_) => self.invalid("build grid"),
                })
            }
        }

        let tempo = self.tempo.ok_or(TapGridError::TempoMissing)?;
        let anchor = self.finalize_anchor()?;

        let grid = build_bar_grid(
            anchor,
            tempo.bpm(),
            self.time_signature,
            duration_ms,
            self.config.grid.leading_bar,
        );
        if grid.is_empty() {
            warn!(
                "[SESSION] No bar fits anchor {:.1} ms in {:.1} ms of audio",
                anchor, duration_ms
            );
            self.grid = None;
            self.transition(SessionState::AnchorValidated);
            return Err(TapGridError::EmptyBarSequence);
        }

        self.grid_generation += 1;
        self.transition(SessionState::GridReady);
        Ok(&*self.grid.insert(grid))
    }

    /// Throw away everything and go back to Idle
    pub fn restart(&mut self) {
        debug!("[SESSION] Restart from {}", self.state);
        self.estimator.reset();
        self.tempo = None;
        self.validator = None;
        self.anchor = None;
        self.grid = None;
        self.state = SessionState::Idle;
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tempo(&self) -> Option<Tempo> {
        self.tempo
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn anchor(&self) -> Option<f64> {
        self.anchor
    }

    pub fn grid(&self) -> Option<&BarGrid> {
        self.grid.as_ref()
    }

    /// Bumped on every grid build; loop selections made on an older grid
    /// must be dropped
    pub fn grid_generation(&self) -> u64 {
        self.grid_generation
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
