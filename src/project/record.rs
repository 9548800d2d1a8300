//! Project record
//!
//! The persisted result of a capture session: tempo, time signature and bar
//! starts for one audio file. Time signatures are stored as `"N/M"` strings
//! and tempo as an integer BPM.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::CaptureSession;
use crate::error::{Result, TapGridError};
use crate::grid::BarGrid;
use crate::timing::{Tempo, TimeSignature};

/// Saved project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier, also the file stem in a store.
    pub id: Uuid,

    pub name: String,

    /// Committed tempo in BPM.
    pub tempo: Tempo,

    pub time_signature: TimeSignature,

    /// Bar starts in milliseconds.
    pub bars: Vec<f64>,

    /// Audio duration in milliseconds.
    pub duration: f64,

    /// Where the audio lives (path or URL); never interpreted here.
    pub audio_reference: String,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project, rejecting a blank name or audio reference.
    pub fn new(
        name: impl Into<String>,
        audio_reference: impl Into<String>,
        tempo: Tempo,
        time_signature: TimeSignature,
        bars: Vec<f64>,
        duration: f64,
    ) -> Result<Self> {
        let now = Utc::now();
        let project = Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            tempo,
            time_signature,
            bars,
            duration,
            audio_reference: audio_reference.into().trim().to_string(),
            created_at: now,
            modified_at: now,
        };
        project.validate()?;
        Ok(project)
    }

    /// Create a project from a session whose grid is built.
    pub fn from_session(
        name: impl Into<String>,
        audio_reference: impl Into<String>,
        session: &CaptureSession,
        duration: f64,
    ) -> Result<Self> {
        let tempo = session.tempo().ok_or(TapGridError::TempoMissing)?;
        let grid = session
            .grid()
            .ok_or_else(|| TapGridError::InvalidTransition {
                from: session.state().to_string(),
                event: "save project".to_string(),
            })?;

        Self::new(
            name,
            audio_reference,
            tempo,
            grid.time_signature(),
            grid.bars().to_vec(),
            duration,
        )
    }

    /// Check the fields a caller can get wrong.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TapGridError::MissingProjectName);
        }
        if self.audio_reference.trim().is_empty() {
            return Err(TapGridError::MissingAudioReference);
        }
        Ok(())
    }

    /// Read a single project file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| TapGridError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let project: Project = serde_json::from_str(&content)?;
        Ok(project)
    }

    /// The bar grid as used by playback.
    pub fn grid(&self) -> BarGrid {
        BarGrid::from_parts(self.bars.clone(), self.tempo, self.time_signature)
    }

    /// Replace the grid after a re-capture.
    pub fn set_grid(&mut self, tempo: Tempo, grid: &BarGrid) {
        self.tempo = tempo;
        self.time_signature = grid.time_signature();
        self.bars = grid.bars().to_vec();
        self.modified_at = Utc::now();
    }

    /// Mark the project as changed.
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            tempo: self.tempo,
            time_signature: self.time_signature,
            bar_count: self.bars.len(),
            modified_at: self.modified_at,
        }
    }
}

/// One row of a project listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
    pub bar_count: usize,
    pub modified_at: DateTime<Utc>,
}

impl fmt::Display for ProjectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.time_signature, self.tempo)
    }
}
