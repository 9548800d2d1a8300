//! Tapgrid - Tap Tempo and Bar Grid Engine
//!
//! Derives a bar grid for a recording from two passes of key presses:
//! 1. Tempo pass - the user taps along; intervals become a BPM estimate
//! 2. Downbeat pass - the user taps the "1" of each bar; aligned taps
//!    become a trusted anchor
//!
//! # Architecture
//!
//! - `capture`: tap-tempo estimation, anchor validation and the session
//!   state machine tying them together
//! - `grid`: bar grid construction, position mapping and loop regions
//! - `playback`: the per-frame cursor transport and its collaborators
//! - `project`: the persisted project record and its store

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod grid;
pub mod playback;
pub mod project;
pub mod timing;

pub use capture::{CaptureSession, SessionState};
pub use config::EngineConfig;
pub use error::{Result, TapGridError};
pub use grid::{build_bar_grid, map_position, BarGrid, LoopRegion, PositionInfo};
pub use timing::{Tempo, TimeSignature};
