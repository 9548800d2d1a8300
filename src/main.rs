//! Tapgrid CLI - tap tempo and bar grid engine
//!
//! Command-line interface for the tapgrid engine.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use tapgrid::cli::commands;
use tapgrid::cli::{Cli, Commands};
use tapgrid::config::EngineConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("Tapgrid v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Some(cmd) => handle_command(&config, cmd),
        None => {
            println!("Tapgrid v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(config: &EngineConfig, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Tempo { taps } => commands::tempo(config, &taps),
        Commands::Anchor {
            bpm,
            time_signature,
            taps,
        } => commands::anchor(config, bpm, time_signature, &taps),
        Commands::Grid {
            anchor,
            bpm,
            time_signature,
            duration,
            json,
        } => commands::grid(config, anchor, bpm, time_signature, duration, json),
        Commands::Position {
            project,
            at,
            loop_bars,
        } => commands::position(config, &project, at, loop_bars.as_deref()),
        Commands::CreateProject {
            store,
            name,
            audio,
            tempo_taps,
            anchor_taps,
            time_signature,
            duration,
        } => {
            info!("Creating project '{}' in {}", name, store.display());
            commands::create_project(
                config,
                &store,
                &name,
                &audio,
                &tempo_taps,
                &anchor_taps,
                time_signature,
                duration,
            )
        }
        Commands::List { store } => commands::list(&store),
        Commands::Show { store, id } => commands::show(&store, id),
        Commands::Simulate {
            project,
            loop_bars,
            step,
            max_loops,
        } => commands::simulate(config, &project, loop_bars.as_deref(), step, max_loops),
    }
}
