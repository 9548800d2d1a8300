//! CLI Module
//!
//! Command-line interface for the tapgrid engine.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::timing::TimeSignature;

/// Tapgrid - tap a tempo and downbeat, get a bar grid
#[derive(Parser, Debug)]
#[command(name = "tapgrid")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate the tempo from a file of tap timestamps
    #[command(name = "tempo")]
    Tempo {
        /// Whitespace separated timestamps in milliseconds
        taps: PathBuf,
    },

    /// Validate downbeat taps against a tempo
    #[command(name = "anchor")]
    Anchor {
        #[arg(long)]
        bpm: u32,

        #[arg(short, long, default_value = "4/4")]
        time_signature: TimeSignature,

        /// Whitespace separated timestamps in milliseconds
        taps: PathBuf,
    },

    /// Build a bar grid
    #[command(name = "grid")]
    Grid {
        /// Validated downbeat in milliseconds
        #[arg(long)]
        anchor: f64,

        #[arg(long)]
        bpm: u32,

        #[arg(short, long, default_value = "4/4")]
        time_signature: TimeSignature,

        /// Audio duration in milliseconds
        #[arg(long)]
        duration: f64,

        /// Print the bars as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Map a playback position onto a project's grid
    #[command(name = "position")]
    Position {
        /// Project file
        #[arg(short, long)]
        project: PathBuf,

        /// Playback position in milliseconds
        #[arg(long)]
        at: f64,

        /// Active loop as START END bar indices
        #[arg(long = "loop", num_args = 2, value_names = ["START", "END"])]
        loop_bars: Option<Vec<usize>>,
    },

    /// Run a full capture session and save the project
    #[command(name = "create-project")]
    CreateProject {
        /// Project store directory
        #[arg(short, long)]
        store: PathBuf,

        #[arg(short, long)]
        name: String,

        /// Audio file the grid belongs to
        #[arg(short, long)]
        audio: PathBuf,

        /// Tempo pass timestamps
        #[arg(long)]
        tempo_taps: PathBuf,

        /// Downbeat pass timestamps
        #[arg(long)]
        anchor_taps: PathBuf,

        #[arg(short, long, default_value = "4/4")]
        time_signature: TimeSignature,

        /// Audio duration in milliseconds (probed from WAV files when omitted)
        #[arg(long)]
        duration: Option<f64>,
    },

    /// List stored projects
    #[command(name = "list")]
    List {
        #[arg(short, long)]
        store: PathBuf,
    },

    /// Print a stored project
    #[command(name = "show")]
    Show {
        #[arg(short, long)]
        store: PathBuf,

        id: Uuid,
    },

    /// Play a project against a simulated clock and print the cursor
    #[command(name = "simulate")]
    Simulate {
        /// Project file
        #[arg(short, long)]
        project: PathBuf,

        /// Active loop as START END bar indices
        #[arg(long = "loop", num_args = 2, value_names = ["START", "END"])]
        loop_bars: Option<Vec<usize>>,

        /// Clock advance per frame in milliseconds
        #[arg(long, default_value_t = 50.0)]
        step: f64,

        /// Stop after this many loop rewinds
        #[arg(long, default_value_t = 2)]
        max_loops: usize,
    },
}
