//! Playback
//!
//! Everything that happens after the grid exists: the per-frame cursor
//! loop, loop rewinds and the metronome, driven through collaborator
//! traits so the host decides what actually makes sound.

pub mod collaborators;
pub mod metronome;
pub mod scheduler;
pub mod simulated;
pub mod transport;

pub use collaborators::{AudioPlayback, Clock, MetronomeSink, SystemClock};
pub use metronome::{Click, ClickPattern, ClickType};
pub use scheduler::{FrameScheduler, IntervalPolicy, Scheduler, TaskHandle};
pub use simulated::{ManualClock, SimulatedMetronome, SimulatedPlayback};
pub use transport::{CursorUpdate, PlaybackTransport, TransportState};
