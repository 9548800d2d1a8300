//! Musical Time
//!
//! Tempo and time-signature value types shared by capture, grid and
//! playback. All durations are milliseconds as `f64`.

pub mod tempo;
pub mod time_signature;

pub use tempo::{Tempo, MAX_BPM};
pub use time_signature::TimeSignature;
