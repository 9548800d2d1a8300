//! Simulated collaborators
//!
//! Deterministic stand-ins for the host's audio element and metronome,
//! used by the CLI `simulate` command and by tests.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, info};

use super::collaborators::{AudioPlayback, Clock, MetronomeSink};
use super::metronome::{Click, ClickPattern};
use crate::timing::{Tempo, TimeSignature};

/// Clock advanced by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Audio element whose position follows a clock while playing
///
/// Playback ends by itself once the position reaches the duration.
#[derive(Debug, Clone)]
pub struct SimulatedPlayback<C: Clock> {
    clock: C,
    duration_ms: f64,
    /// Position when playback last started or seeked
    base_ms: f64,
    /// Clock reading at that moment, while playing
    started_at: Option<f64>,
    seeks: Vec<f64>,
}

impl<C: Clock> SimulatedPlayback<C> {
    pub fn new(clock: C, duration_ms: f64) -> Self {
        Self {
            clock,
            duration_ms: duration_ms.max(0.0),
            base_ms: 0.0,
            started_at: None,
            seeks: Vec::new(),
        }
    }

    fn raw_position(&self) -> f64 {
        match self.started_at {
            Some(start) => self.base_ms + (self.clock.now_ms() - start),
            None => self.base_ms,
        }
    }

    /// Every seek target received, in order
    pub fn seeks(&self) -> &[f64] {
        &self.seeks
    }
}

impl<C: Clock> AudioPlayback for SimulatedPlayback<C> {
    fn current_position_ms(&self) -> f64 {
        self.raw_position().min(self.duration_ms)
    }

    fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some() && self.raw_position() < self.duration_ms
    }

    fn play(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now_ms());
        }
    }

    fn pause(&mut self) {
        self.base_ms = self.current_position_ms();
        self.started_at = None;
    }

    fn seek(&mut self, position_ms: f64) {
        self.base_ms = position_ms.clamp(0.0, self.duration_ms);
        if self.started_at.is_some() {
            self.started_at = Some(self.clock.now_ms());
        }
        self.seeks.push(self.base_ms);
        debug!("[AUDIO] Seek to {:.1} ms", self.base_ms);
    }
}

/// Metronome that records what it was asked to do
#[derive(Debug, Clone, Default)]
pub struct SimulatedMetronome {
    schedule: Option<(u32, u32)>,
    stops: usize,
}

impl SimulatedMetronome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current `(bpm, beats_per_bar)` while clicking
    pub fn schedule(&self) -> Option<(u32, u32)> {
        self.schedule
    }

    pub fn is_running(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn stop_count(&self) -> usize {
        self.stops
    }

    /// Clicks the current schedule produces before `until_ms`
    pub fn clicks_until(&self, until_ms: f64) -> Vec<Click> {
        let Some((bpm, beats_per_bar)) = self.schedule else {
            return Vec::new();
        };
        let (Ok(tempo), Ok(time_signature)) =
            (Tempo::new(bpm), TimeSignature::new(beats_per_bar, 4))
        else {
            return Vec::new();
        };
        ClickPattern::new(tempo, time_signature)
            .take_while(|click| click.time_ms < until_ms)
            .collect()
    }
}

impl MetronomeSink for SimulatedMetronome {
    fn schedule_repeating_click(&mut self, bpm: u32, beats_per_bar: u32) {
        info!("[METRONOME] Clicking at {} BPM, accent every {} beats", bpm, beats_per_bar);
        self.schedule = Some((bpm, beats_per_bar));
    }

    fn stop(&mut self) {
        if self.schedule.take().is_some() {
            debug!("[METRONOME] Stopped");
        }
        self.stops += 1;
    }
}
