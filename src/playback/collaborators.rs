//! Interfaces the engine consumes from the host application

use std::time::Instant;

/// Monotonic millisecond clock
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock measured from construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// The audio element playing the project's recording
pub trait AudioPlayback {
    fn current_position_ms(&self) -> f64;
    fn duration_ms(&self) -> f64;
    fn is_playing(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position_ms: f64);
}

/// Beat-click generator that runs alongside playback
pub trait MetronomeSink {
    fn schedule_repeating_click(&mut self, bpm: u32, beats_per_bar: u32);
    fn stop(&mut self);
}
