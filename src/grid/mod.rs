//! Bar Grid Module
//!
//! Everything downstream of a validated anchor:
//! - Tiling the anchor into a bar sequence
//! - Mapping playback positions onto bars and beats
//! - Loop regions and their click-driven selection

pub mod builder;
pub mod loop_region;
pub mod position;

pub use builder::{build_bar_grid, BarGrid, LeadingBarPolicy, MAX_GRID_BARS};
pub use loop_region::{LoopRegion, LoopSelection};
pub use position::{map_position, PositionInfo, PositionMapper};
