//! Playback Transport State Machine
//!
//! Owns a project's bar grid during playback: starts and stops the audio,
//! the metronome and the cursor polling task together, and rewinds to the
//! loop start when an active loop runs out.
//!
//! The polling task is self-terminating: the first `tick` after the audio
//! stops playing cancels it.

use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;

use super::collaborators::{AudioPlayback, MetronomeSink};
use super::scheduler::{IntervalPolicy, Scheduler, TaskHandle};
use crate::config::EngineConfig;
use crate::error::{Result, TapGridError};
use crate::grid::{BarGrid, LoopSelection, PositionMapper};
use crate::timing::Tempo;

/// Transport states representing the current playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Nothing playing, cursor cleared (default state)
    #[default]
    Stopped,
    /// Audio is playing and the cursor is polled
    Playing,
    /// Playback halted where it was
    Paused,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Stopped => write!(f, "Stopped"),
            TransportState::Playing => write!(f, "Playing"),
            TransportState::Paused => write!(f, "Paused"),
        }
    }
}

/// Cursor produced by one polling tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CursorUpdate {
    /// Position after any loop rewind
    pub position_ms: f64,
    pub bar_index: usize,
    pub subdivision_index: u32,
    /// The tick rewound playback to the loop start
    pub looped: bool,
}

/// Drives playback of one project against its bar grid
///
/// The PlaybackTransport handles:
/// - State transitions (play, pause, stop)
/// - Per-frame cursor updates and loop rewinds
/// - Loop selection, which survives pause and stop
/// - Cancelling the polling task on every halt and on drop
pub struct PlaybackTransport<A: AudioPlayback, M: MetronomeSink, S: Scheduler> {
    audio: A,
    metronome: M,
    scheduler: S,

    grid: BarGrid,
    tempo: Tempo,
    selection: LoopSelection,
    mapper: PositionMapper,
    fallback_bar_ms: f64,
    policy: IntervalPolicy,

    state: TransportState,
    task: Option<TaskHandle>,
    cursor: Option<CursorUpdate>,
    grid_generation: u64,
}

impl<A: AudioPlayback, M: MetronomeSink, S: Scheduler> PlaybackTransport<A, M, S> {
    /// Create a stopped transport for `grid`
    ///
    /// # Example
    /// ```
    /// use tapgrid::config::EngineConfig;
    /// use tapgrid::grid::{build_bar_grid, LeadingBarPolicy};
    /// use tapgrid::playback::{
    ///     FrameScheduler, ManualClock, PlaybackTransport, SimulatedMetronome, SimulatedPlayback,
    /// };
    /// use tapgrid::timing::{Tempo, TimeSignature};
    ///
    /// let tempo = Tempo::new(120).unwrap();
    /// let grid = build_bar_grid(0.0, 120, TimeSignature::FOUR_FOUR, 8000.0, LeadingBarPolicy::None);
    /// let clock = ManualClock::new();
    /// let mut transport = PlaybackTransport::new(
    ///     SimulatedPlayback::new(clock.clone(), 8000.0),
    ///     SimulatedMetronome::new(),
    ///     FrameScheduler::new(),
    ///     grid,
    ///     tempo,
    ///     &EngineConfig::default(),
    /// );
    ///
    /// transport.play().unwrap();
    /// clock.advance(2500.0);
    /// let cursor = transport.tick().unwrap().unwrap();
    /// assert_eq!((cursor.bar_index, cursor.subdivision_index), (1, 1));
    /// ```
    pub fn new(
        audio: A,
        metronome: M,
        scheduler: S,
        grid: BarGrid,
        tempo: Tempo,
        config: &EngineConfig,
    ) -> Self {
        Self {
            audio,
            metronome,
            scheduler,
            mapper: PositionMapper::for_grid(&grid, config.grid.fallback_bar_ms),
            grid,
            tempo,
            selection: LoopSelection::new(),
            fallback_bar_ms: config.grid.fallback_bar_ms,
            policy: config.playback.interval,
            state: TransportState::Stopped,
            task: None,
            cursor: None,
            grid_generation: 0,
        }
    }

    // ========================================================================
    // Standard Transport Controls
    // ========================================================================

    /// Start or resume playback
    ///
    /// State transitions: Stopped | Paused -> Playing
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            TransportState::Stopped | TransportState::Paused => {
                if self.grid.is_empty() {
                    return Err(TapGridError::EmptyBarSequence);
                }
                self.metronome.schedule_repeating_click(
                    self.tempo.bpm(),
                    self.grid.time_signature().beats_per_bar(),
                );
                self.audio.play();
                self.task = Some(self.scheduler.start(self.policy));
                debug!(
                    "[TRANSPORT] {} -> Playing from {:.1} ms",
                    self.state,
                    self.audio.current_position_ms()
                );
                self.state = TransportState::Playing;
            }
            TransportState::Playing => {
                debug!("[TRANSPORT] Already playing");
            }
        }
        Ok(())
    }

    /// Pause playback; grid, loop and cursor stay as they are
    ///
    /// State transitions:
    /// - Playing -> Paused
    /// - Stopped | Paused -> unchanged
    pub fn pause(&mut self) {
        match self.state {
            TransportState::Playing => {
                self.halt();
                self.audio.pause();
                self.state = TransportState::Paused;
                debug!(
                    "[TRANSPORT] Paused at {:.1} ms",
                    self.audio.current_position_ms()
                );
            }
            TransportState::Paused | TransportState::Stopped => {
                debug!("[TRANSPORT] Pause ignored while {}", self.state);
            }
        }
    }

    /// Stop playback, rewind to 0 and clear the cursor
    ///
    /// State transitions: Any -> Stopped. The loop selection is kept.
    pub fn stop(&mut self) {
        self.halt();
        self.audio.pause();
        self.audio.seek(0.0);
        self.cursor = None;
        self.state = TransportState::Stopped;
        debug!("[TRANSPORT] Stopped, playhead reset to 0");
    }

    /// Cancel the polling task and the metronome together
    fn halt(&mut self) {
        if let Some(handle) = self.task.take() {
            self.scheduler.cancel(handle);
        }
        self.metronome.stop();
    }

    /// Per-frame polling callback
    ///
    /// Returns `None` when no task is running, including the tick on which
    /// the audio was found to have ended.
    pub fn tick(&mut self) -> Result<Option<CursorUpdate>> {
        let Some(handle) = self.task else {
            return Ok(None);
        };
        if !self.scheduler.is_live(handle) {
            warn!("[TRANSPORT] Polling task {} was cancelled externally", handle.id());
            self.task = None;
            return Ok(None);
        }

        if !self.audio.is_playing() {
            self.halt();
            self.state = TransportState::Stopped;
            info!(
                "[TRANSPORT] Playback ended at {:.1} ms",
                self.audio.current_position_ms()
            );
            return Ok(None);
        }

        let position = self.audio.current_position_ms();
        let info = match self.mapper.map(
            self.grid.bars(),
            self.grid.time_signature(),
            position,
            self.selection.active_region(),
        ) {
            Ok(info) => info,
            Err(e) => {
                warn!("[TRANSPORT] Cursor lost at {:.1} ms, stopping: {}", position, e);
                self.halt();
                self.audio.pause();
                self.state = TransportState::Stopped;
                return Err(e);
            }
        };

        let cursor = match info.seek_target {
            Some(target) => {
                self.audio.seek(target);
                CursorUpdate {
                    position_ms: target,
                    bar_index: info.bar_index,
                    subdivision_index: info.subdivision_index,
                    looped: true,
                }
            }
            None => CursorUpdate {
                position_ms: position,
                bar_index: info.bar_index,
                subdivision_index: info.subdivision_index,
                looped: false,
            },
        };

        self.cursor = Some(cursor);
        Ok(Some(cursor))
    }

    // ========================================================================
    // Loop Selection
    // ========================================================================

    /// Apply a click on bar `index` to the loop selection
    pub fn click_bar(&mut self, index: usize) -> Result<()> {
        if index >= self.grid.len() {
            return Err(TapGridError::InvalidLoopRegion {
                start: index,
                end: index,
                reason: format!("grid has {} bars", self.grid.len()),
            });
        }
        self.selection.click(index);
        Ok(())
    }

    /// Switch looping on or off; returns the new flag
    pub fn toggle_loop(&mut self) -> bool {
        self.selection.toggle_active()
    }

    pub fn clear_loop(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &LoopSelection {
        &self.selection
    }

    // ========================================================================
    // Grid
    // ========================================================================

    /// Swap in a rebuilt grid
    ///
    /// The old loop selection refers to bars that no longer exist, so it is
    /// dropped. A running metronome is rescheduled at the new tempo; an
    /// empty grid stops playback instead.
    pub fn replace_grid(&mut self, grid: BarGrid, tempo: Tempo) {
        self.mapper = PositionMapper::for_grid(&grid, self.fallback_bar_ms);
        self.grid = grid;
        self.tempo = tempo;
        self.selection.clear();
        self.cursor = None;
        self.grid_generation += 1;

        if self.state == TransportState::Playing && self.grid.is_empty() {
            warn!("[TRANSPORT] Replacement grid has no bars, stopping playback");
            self.halt();
            self.audio.pause();
            self.state = TransportState::Stopped;
        } else if self.state == TransportState::Playing {
            self.metronome.stop();
            self.metronome.schedule_repeating_click(
                tempo.bpm(),
                self.grid.time_signature().beats_per_bar(),
            );
        }
        debug!(
            "[TRANSPORT] Grid replaced ({} bars, generation {})",
            self.grid.len(),
            self.grid_generation
        );
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Whether a polling task is outstanding
    pub fn is_polling(&self) -> bool {
        self.task.is_some()
    }

    pub fn polling_interval(&self) -> IntervalPolicy {
        self.policy
    }

    /// Last cursor reported by `tick`
    pub fn cursor(&self) -> Option<CursorUpdate> {
        self.cursor
    }

    pub fn grid(&self) -> &BarGrid {
        &self.grid
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn grid_generation(&self) -> u64 {
        self.grid_generation
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn metronome(&self) -> &M {
        &self.metronome
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

impl<A: AudioPlayback, M: MetronomeSink, S: Scheduler> Drop for PlaybackTransport<A, M, S> {
    fn drop(&mut self) {
        if self.task.is_some() {
            debug!("[TRANSPORT] Dropped while polling, cancelling task");
            self.halt();
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{build_bar_grid, LeadingBarPolicy, LoopRegion};
    use crate::playback::{FrameScheduler, ManualClock, SimulatedMetronome, SimulatedPlayback};
    use crate::timing::TimeSignature;

    type TestTransport =
        PlaybackTransport<SimulatedPlayback<ManualClock>, SimulatedMetronome, FrameScheduler>;

    const DURATION: f64 = 10_000.0;

    /// Bars at 0, 2000, 4000, 6000, 8000
    fn transport() -> (TestTransport, ManualClock) {
        let clock = ManualClock::new();
        let tempo = Tempo::new(120).unwrap();
        let grid = build_bar_grid(
            0.0,
            tempo.bpm(),
            TimeSignature::FOUR_FOUR,
            DURATION,
            LeadingBarPolicy::None,
        );
        let transport = PlaybackTransport::new(
            SimulatedPlayback::new(clock.clone(), DURATION),
            SimulatedMetronome::new(),
            FrameScheduler::new(),
            grid,
            tempo,
            &EngineConfig::default(),
        );
        (transport, clock)
    }

    // ------------------------------------------------------------------------
    // Basic State Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_default_state_is_stopped() {
        let (transport, _) = transport();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert!(!transport.is_polling());
        assert_eq!(transport.cursor(), None);
    }

    #[test]
    fn test_play_starts_everything() {
        let (mut transport, _) = transport();
        transport.play().unwrap();

        assert!(transport.is_playing());
        assert!(transport.is_polling());
        assert!(transport.audio().is_playing());
        assert_eq!(transport.metronome().schedule(), Some((120, 4)));
        assert_eq!(transport.scheduler().live_count(), 1);
    }

    #[test]
    fn test_double_play_no_op() {
        let (mut transport, _) = transport();
        transport.play().unwrap();
        transport.play().unwrap();
        assert_eq!(transport.scheduler().started_count(), 1);
    }

    #[test]
    fn test_play_with_empty_grid_fails() {
        let (mut transport, _) = transport();
        let empty = build_bar_grid(0.0, 0, TimeSignature::FOUR_FOUR, DURATION, LeadingBarPolicy::None);
        transport.replace_grid(empty, Tempo::new(120).unwrap());
        assert!(matches!(transport.play(), Err(TapGridError::EmptyBarSequence)));
        assert!(!transport.is_polling());
    }

    #[test]
    fn test_pause_cancels_task_and_keeps_position() {
        let (mut transport, clock) = transport();
        transport.play().unwrap();
        clock.advance(3000.0);
        transport.tick().unwrap();

        transport.pause();
        assert_eq!(transport.state(), TransportState::Paused);
        assert!(!transport.is_polling());
        assert_eq!(transport.scheduler().live_count(), 0);
        assert!(!transport.metronome().is_running());
        assert_eq!(transport.audio().current_position_ms(), 3000.0);
        assert!(transport.cursor().is_some());
    }

    #[test]
    fn test_resume_after_pause() {
        let (mut transport, clock) = transport();
        transport.play().unwrap();
        clock.advance(3000.0);
        transport.pause();
        clock.advance(5000.0);

        transport.play().unwrap();
        clock.advance(1000.0);
        let cursor = transport.tick().unwrap().unwrap();
        assert_eq!(cursor.position_ms, 4000.0);
        assert_eq!(cursor.bar_index, 2);
    }

    #[test]
    fn test_stop_resets_playhead_and_keeps_loop() {
        let (mut transport, clock) = transport();
        transport.click_bar(1).unwrap();
        transport.toggle_loop();
        transport.play().unwrap();
        clock.advance(2500.0);
        transport.tick().unwrap();

        transport.stop();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.audio().current_position_ms(), 0.0);
        assert_eq!(transport.cursor(), None);
        assert!(!transport.is_polling());
        assert_eq!(
            transport.selection().active_region(),
            Some(LoopRegion::new(1, 1).unwrap())
        );
        assert_eq!(transport.grid().len(), 5);
    }

    // ------------------------------------------------------------------------
    // Polling Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_tick_reports_bar_and_beat() {
        let (mut transport, clock) = transport();
        transport.play().unwrap();
        clock.advance(5100.0);

        let cursor = transport.tick().unwrap().unwrap();
        assert_eq!(cursor.bar_index, 2);
        assert_eq!(cursor.subdivision_index, 2);
        assert!(!cursor.looped);
    }

    #[test]
    fn test_tick_without_task_is_none() {
        let (mut transport, _) = transport();
        assert_eq!(transport.tick().unwrap(), None);
    }

    #[test]
    fn test_loop_rewinds_at_end_of_last_loop_bar() {
        let (mut transport, clock) = transport();
        transport.click_bar(1).unwrap();
        transport.click_bar(1).unwrap();
        transport.click_bar(2).unwrap();
        assert!(transport.toggle_loop());

        transport.play().unwrap();
        clock.advance(5999.0);
        assert!(!transport.tick().unwrap().unwrap().looped);

        clock.advance(1.0);
        let cursor = transport.tick().unwrap().unwrap();
        assert!(cursor.looped);
        assert_eq!(cursor.bar_index, 1);
        assert_eq!(cursor.position_ms, 2000.0);
        assert_eq!(transport.audio().seeks(), &[2000.0]);

        // Playback continues from the loop start
        clock.advance(100.0);
        let cursor = transport.tick().unwrap().unwrap();
        assert_eq!(cursor.position_ms, 2100.0);
        assert_eq!(cursor.bar_index, 1);
    }

    #[test]
    fn test_inactive_loop_is_ignored() {
        let (mut transport, clock) = transport();
        transport.click_bar(0).unwrap();
        transport.play().unwrap();
        clock.advance(2500.0);
        let cursor = transport.tick().unwrap().unwrap();
        assert!(!cursor.looped);
        assert_eq!(cursor.bar_index, 1);
    }

    #[test]
    fn test_polling_terminates_when_audio_ends() {
        let (mut transport, clock) = transport();
        transport.play().unwrap();
        clock.advance(DURATION + 1.0);

        assert_eq!(transport.tick().unwrap(), None);
        assert_eq!(transport.state(), TransportState::Stopped);
        assert!(!transport.is_polling());
        assert_eq!(transport.scheduler().live_count(), 0);
        assert!(!transport.metronome().is_running());
    }

    // ------------------------------------------------------------------------
    // Loop Selection and Grid Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_click_outside_grid_rejected() {
        let (mut transport, _) = transport();
        let err = transport.click_bar(5).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_LOOP_REGION");
    }

    #[test]
    fn test_replace_grid_drops_loop() {
        let (mut transport, _) = transport();
        transport.click_bar(2).unwrap();
        transport.toggle_loop();

        let waltz = TimeSignature::new(3, 4).unwrap();
        let tempo = Tempo::new(90).unwrap();
        let grid = build_bar_grid(500.0, 90, waltz, DURATION, LeadingBarPolicy::PickupBar);
        transport.replace_grid(grid, tempo);

        assert_eq!(transport.selection().region(), None);
        assert!(!transport.selection().is_active());
        assert_eq!(transport.grid_generation(), 1);
        assert_eq!(transport.tempo().bpm(), 90);
    }

    #[test]
    fn test_replace_grid_while_playing_reschedules_metronome() {
        let (mut transport, _) = transport();
        transport.play().unwrap();
        let waltz = TimeSignature::new(3, 4).unwrap();
        let grid = build_bar_grid(0.0, 90, waltz, DURATION, LeadingBarPolicy::None);
        transport.replace_grid(grid, Tempo::new(90).unwrap());
        assert_eq!(transport.metronome().schedule(), Some((90, 3)));
    }

    #[test]
    fn test_empty_replacement_grid_stops_playback() {
        let (mut transport, clock) = transport();
        transport.play().unwrap();
        clock.advance(500.0);
        transport.tick().unwrap();

        let empty = build_bar_grid(0.0, 120, TimeSignature::FOUR_FOUR, 0.0, LeadingBarPolicy::None);
        transport.replace_grid(empty, Tempo::new(120).unwrap());

        assert_eq!(transport.state(), TransportState::Stopped);
        assert!(!transport.is_polling());
        assert_eq!(transport.scheduler().live_count(), 0);
        assert!(!transport.metronome().is_running());

        clock.advance(100.0);
        assert_eq!(transport.tick().unwrap(), None);
    }

    #[test]
    fn test_last_bar_beats_match_grid_tempo() {
        let (mut transport, clock) = transport();
        transport.play().unwrap();

        // Last bar starts at 8000 with 500 ms beats, not the 4000 ms fallback
        clock.advance(9600.0);
        let cursor = transport.tick().unwrap().unwrap();
        assert_eq!(cursor.bar_index, 4);
        assert_eq!(cursor.subdivision_index, 3);
    }

    #[test]
    fn test_drop_cancels_outstanding_task() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Shared(Rc<RefCell<FrameScheduler>>);

        impl Scheduler for Shared {
            fn start(&mut self, policy: IntervalPolicy) -> TaskHandle {
                self.0.borrow_mut().start(policy)
            }
            fn cancel(&mut self, handle: TaskHandle) {
                self.0.borrow_mut().cancel(handle)
            }
            fn is_live(&self, handle: TaskHandle) -> bool {
                self.0.borrow().is_live(handle)
            }
        }

        let scheduler = Rc::new(RefCell::new(FrameScheduler::new()));
        let clock = ManualClock::new();
        let grid = build_bar_grid(0.0, 120, TimeSignature::FOUR_FOUR, DURATION, LeadingBarPolicy::None);
        let mut transport = PlaybackTransport::new(
            SimulatedPlayback::new(clock, DURATION),
            SimulatedMetronome::new(),
            Shared(Rc::clone(&scheduler)),
            grid,
            Tempo::new(120).unwrap(),
            &EngineConfig::default(),
        );

        transport.play().unwrap();
        assert_eq!(scheduler.borrow().live_count(), 1);

        drop(transport);
        assert_eq!(scheduler.borrow().live_count(), 0);
    }

    #[test]
    fn test_transport_state_display() {
        assert_eq!(format!("{}", TransportState::Stopped), "Stopped");
        assert_eq!(format!("{}", TransportState::Playing), "Playing");
        assert_eq!(format!("{}", TransportState::Paused), "Paused");
    }
}
