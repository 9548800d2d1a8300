//! Projects
//!
//! A project ties a recording to its captured tempo and bar grid.
//! Persistence goes through the `ProjectStore` trait; `JsonProjectStore`
//! is the file-backed implementation.

pub mod audio;
pub mod record;
pub mod store;

pub use audio::probe_wav_duration_ms;
pub use record::{Project, ProjectSummary};
pub use store::{JsonProjectStore, ProjectStore};
