//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use uuid::Uuid;

use crate::capture::{AnchorValidator, CaptureSession, SessionState, TapTempoEstimator};
use crate::config::EngineConfig;
use crate::error::TapGridError;
use crate::grid::{build_bar_grid, LoopRegion, PositionMapper};
use crate::playback::{
    AudioPlayback, FrameScheduler, ManualClock, PlaybackTransport, SimulatedMetronome,
    SimulatedPlayback,
};
use crate::project::{probe_wav_duration_ms, JsonProjectStore, Project, ProjectStore};
use crate::timing::{Tempo, TimeSignature};

/// Read whitespace or comma separated millisecond timestamps.
pub fn read_timestamps(path: &Path) -> Result<Vec<f64>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read taps from {}", path.display()))?;

    content
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .with_context(|| format!("Invalid timestamp '{}' in {}", token, path.display()))
        })
        .collect()
}

/// Print an engine error with its suggestion, then hand it back.
fn explain(err: TapGridError) -> anyhow::Error {
    println!("Error [{}]: {}", err.error_code(), err);
    if let Some(suggestion) = err.recovery_suggestion() {
        println!("Hint: {}", suggestion);
    }
    err.into()
}

fn loop_region(bars: Option<&[usize]>) -> Result<Option<LoopRegion>> {
    match bars {
        Some(&[start, end]) => Ok(Some(LoopRegion::new(start, end)?)),
        Some(other) => bail!("--loop takes START END, got {} values", other.len()),
        None => Ok(None),
    }
}

/// Estimate a tempo from a taps file.
pub fn tempo(config: &EngineConfig, taps_file: &Path) -> Result<()> {
    let taps = read_timestamps(taps_file)?;
    info!("Estimating tempo from {} taps", taps.len());

    let mut estimator = TapTempoEstimator::new(config.tap_tempo);
    for t in &taps {
        estimator.tap(*t);
    }

    let estimate = estimator.estimate();
    match estimate.bpm {
        Some(bpm) => println!(
            "Estimate: {} BPM ({} intervals, {})",
            bpm,
            estimate.interval_count,
            if estimate.stable { "stable" } else { "unstable" }
        ),
        None => println!("Estimate: none (no plausible intervals)"),
    }

    let tempo = estimator.commit().map_err(explain)?;
    println!("Committed tempo: {}", tempo);
    Ok(())
}

/// Validate downbeat taps and print the anchor.
pub fn anchor(
    config: &EngineConfig,
    bpm: u32,
    time_signature: TimeSignature,
    taps_file: &Path,
) -> Result<()> {
    let tempo = Tempo::new(bpm).map_err(explain)?;
    let taps = read_timestamps(taps_file)?;

    let mut validator = AnchorValidator::new(tempo, time_signature, config.anchor);
    println!(
        "Bar: {:.1} ms, tolerance: ±{:.1} ms",
        validator.bar_ms(),
        validator.tolerance_ms()
    );

    for t in taps {
        let outcome = validator.tap(t);
        if let Some(drift) = outcome.drift {
            println!(
                "Tap at {:.1} ms drifted {:+.1} ms from {:.1} ms, sequence reset",
                drift.actual_ms,
                drift.offset_ms(),
                drift.expected_ms
            );
        }
    }

    let anchor = validator.finalize().map_err(explain)?;
    println!("Anchor: {:.1} ms", anchor);
    Ok(())
}

/// Build and print a bar grid.
pub fn grid(
    config: &EngineConfig,
    anchor: f64,
    bpm: u32,
    time_signature: TimeSignature,
    duration: f64,
    json: bool,
) -> Result<()> {
    let grid = build_bar_grid(
        anchor,
        bpm,
        time_signature,
        duration,
        config.grid.leading_bar,
    );

    if json {
        println!("{}", serde_json::to_string(grid.bars())?);
        return Ok(());
    }

    if grid.is_empty() {
        println!("Empty grid (check anchor, tempo and duration)");
        return Ok(());
    }

    println!("{} bars of {:.1} ms in {}", grid.len(), grid.bar_ms(), time_signature);
    for (index, start) in grid.bars().iter().enumerate() {
        println!("  bar {:>4}: {:>12.1} ms", index, start);
    }
    Ok(())
}

/// Map one playback position against a project file.
pub fn position(
    config: &EngineConfig,
    project_file: &Path,
    at: f64,
    loop_bars: Option<&[usize]>,
) -> Result<()> {
    let project = Project::from_file(project_file)
        .with_context(|| format!("Failed to load project {}", project_file.display()))?;
    let region = loop_region(loop_bars)?;

    let mapper = PositionMapper::for_grid(&project.grid(), config.grid.fallback_bar_ms);
    let info = mapper
        .map(&project.bars, project.time_signature, at, region)
        .map_err(explain)?;

    println!(
        "{:.1} ms -> bar {}, beat {}",
        at,
        info.bar_index,
        info.subdivision_index + 1
    );
    if let Some(target) = info.seek_target {
        println!("Loop wraps: seek to {:.1} ms", target);
    }
    Ok(())
}

/// Run a whole capture session from two taps files and save the project.
#[allow(clippy::too_many_arguments)]
pub fn create_project(
    config: &EngineConfig,
    store_dir: &Path,
    name: &str,
    audio: &Path,
    tempo_taps: &Path,
    anchor_taps: &Path,
    time_signature: TimeSignature,
    duration: Option<f64>,
) -> Result<()> {
    let duration = match duration {
        Some(ms) => ms,
        None => probe_wav_duration_ms(audio)
            .with_context(|| "Pass --duration for audio that is not a WAV file")?,
    };

    let mut session = CaptureSession::new(*config)?;

    session.start_tempo()?;
    for t in read_timestamps(tempo_taps)? {
        session.tap(t)?;
    }
    let tempo = session.commit_tempo().map_err(explain)?;
    println!("Tempo: {}", tempo);

    session.start_anchor(time_signature)?;
    for t in read_timestamps(anchor_taps)? {
        if session.state() == SessionState::AnchorValidated {
            break;
        }
        session.tap(t)?;
    }
    let anchor = session.finalize_anchor().map_err(explain)?;
    println!("Anchor: {:.1} ms", anchor);

    let bar_count = session.build_grid(duration).map_err(explain)?.len();

    let mut project =
        Project::from_session(name, audio.to_string_lossy(), &session, duration)?;
    let store = JsonProjectStore::new(store_dir);
    store.save(&mut project)?;

    println!("Project created: {}", project.id);
    println!("  {} with {} bars", project.summary(), bar_count);
    Ok(())
}

/// List projects in a store.
pub fn list(store_dir: &Path) -> Result<()> {
    let store = JsonProjectStore::new(store_dir);
    let projects = store.list()?;

    if projects.is_empty() {
        println!("No projects in {}", store_dir.display());
        return Ok(());
    }

    for summary in projects {
        println!(
            "{}  {}  [{} bars, modified {}]",
            summary.id,
            summary,
            summary.bar_count,
            summary.modified_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// Print a stored project as JSON.
pub fn show(store_dir: &Path, id: Uuid) -> Result<()> {
    let store = JsonProjectStore::new(store_dir);
    let project = store.load(id).map_err(explain)?;
    println!("{}", serde_json::to_string_pretty(&project)?);
    Ok(())
}

/// Play a project against a simulated clock and print cursor changes.
pub fn simulate(
    config: &EngineConfig,
    project_file: &Path,
    loop_bars: Option<&[usize]>,
    step: f64,
    max_loops: usize,
) -> Result<()> {
    if !(step > 0.0) {
        bail!("--step must be positive");
    }

    let project = Project::from_file(project_file)
        .with_context(|| format!("Failed to load project {}", project_file.display()))?;

    let clock = ManualClock::new();
    let mut transport = PlaybackTransport::new(
        SimulatedPlayback::new(clock.clone(), project.duration),
        SimulatedMetronome::new(),
        FrameScheduler::new(),
        project.grid(),
        project.tempo,
        config,
    );

    if let Some(region) = loop_region(loop_bars)? {
        region.check_within(transport.grid().len())?;
        transport.click_bar(region.start_bar())?;
        if region.end_bar() != region.start_bar() {
            // A single click selects one bar; start over with the end pending
            transport.click_bar(region.start_bar())?;
            transport.click_bar(region.end_bar())?;
        }
        transport.toggle_loop();
    }

    transport.play().map_err(explain)?;
    println!("Playing '{}' ({:.1} ms)", project.name, transport.audio().duration_ms());
    for click in transport.metronome().clicks_until(transport.grid().bar_ms()) {
        println!(
            "  click {} at {:>8.1} ms: {} ({} dB)",
            click.beat,
            click.time_ms,
            click.click_type,
            click.click_type.gain_db()
        );
    }

    let mut last = None;
    let mut loops = 0;
    loop {
        clock.advance(step);
        let Some(cursor) = transport.tick()? else {
            break;
        };

        if cursor.looped {
            loops += 1;
            println!("  loop -> {:.1} ms (bar {})", cursor.position_ms, cursor.bar_index);
            if loops >= max_loops {
                transport.stop();
                break;
            }
        }
        let current = (cursor.bar_index, cursor.subdivision_index);
        if last != Some(current) {
            println!(
                "  {:>10.1} ms  bar {:>3}  beat {}",
                cursor.position_ms,
                cursor.bar_index,
                cursor.subdivision_index + 1
            );
            last = Some(current);
        }
    }

    println!("Finished in state {}", transport.state());
    Ok(())
}
