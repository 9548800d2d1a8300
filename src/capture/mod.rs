//! Tap Capture Module
//!
//! Turns key presses into musical timing:
//! - Tap-tempo estimation (first pass)
//! - Downbeat anchor validation (second pass)
//! - The capture session state machine tying both passes to the bar grid

pub mod anchor;
pub mod session;
pub mod tap_tempo;

pub use anchor::{AnchorOutcome, AnchorValidator, DriftReport};
pub use session::{CaptureSession, SessionState, TapResponse};
pub use tap_tempo::{TapTempoEstimator, TempoEstimate};
