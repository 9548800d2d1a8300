//! Error handling for Tapgrid
//!
//! Every engine error is recoverable by re-running the capture or build
//! step. Errors carry enough structure for a caller to render precise
//! guidance ("need 5 aligned taps, got 3").

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Tapgrid operations
pub type Result<T> = std::result::Result<T, TapGridError>;

/// Main error type for Tapgrid operations
#[derive(Error, Debug)]
pub enum TapGridError {
    // Precondition Errors
    #[error("Tempo has not been committed yet")]
    TempoMissing,

    #[error("Invalid tempo: {bpm} BPM (expected 1 to {})", crate::timing::MAX_BPM)]
    InvalidTempo { bpm: u32 },

    #[error("Invalid time signature: {value}")]
    InvalidTimeSignature { value: String },

    #[error("Cannot {event} while {from}")]
    InvalidTransition { from: String, event: String },

    // Evidence Errors
    #[error("Need {required} taps, got {got}")]
    InsufficientTaps { required: usize, got: usize },

    #[error("Tempo is not stable yet: taps deviate up to {deviation_ms:.1} ms (limit {limit_ms:.1} ms)")]
    UnstableTempo { deviation_ms: f64, limit_ms: f64 },

    #[error("Tap at {actual_ms:.1} ms drifted from expected {expected_ms:.1} ms (tolerance {tolerance_ms:.1} ms)")]
    DriftExceeded {
        expected_ms: f64,
        actual_ms: f64,
        tolerance_ms: f64,
    },

    // Grid Errors
    #[error("Bar sequence is empty")]
    EmptyBarSequence,

    #[error("Invalid loop region {start}..={end}: {reason}")]
    InvalidLoopRegion {
        start: usize,
        end: usize,
        reason: String,
    },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Project Errors
    #[error("Project name is empty")]
    MissingProjectName,

    #[error("Project has no audio reference")]
    MissingAudioReference,

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read audio header: {path}: {reason}")]
    AudioProbe { path: PathBuf, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TapGridError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            TapGridError::TempoMissing => "TEMPO_MISSING",
            TapGridError::InvalidTempo { .. } => "INVALID_TEMPO",
            TapGridError::InvalidTimeSignature { .. } => "INVALID_TIME_SIGNATURE",
            TapGridError::InvalidTransition { .. } => "INVALID_TRANSITION",
            TapGridError::InsufficientTaps { .. } => "INSUFFICIENT_TAPS",
            TapGridError::UnstableTempo { .. } => "UNSTABLE_TEMPO",
            TapGridError::DriftExceeded { .. } => "DRIFT_EXCEEDED",
            TapGridError::EmptyBarSequence => "EMPTY_BAR_SEQUENCE",
            TapGridError::InvalidLoopRegion { .. } => "INVALID_LOOP_REGION",
            TapGridError::InvalidConfig { .. } => "INVALID_CONFIG",
            TapGridError::MissingProjectName => "MISSING_PROJECT_NAME",
            TapGridError::MissingAudioReference => "MISSING_AUDIO_REFERENCE",
            TapGridError::ProjectNotFound { .. } => "PROJECT_NOT_FOUND",
            TapGridError::FileReadError { .. } => "FILE_READ_ERROR",
            TapGridError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            TapGridError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            TapGridError::AudioProbe { .. } => "AUDIO_PROBE_ERROR",
            TapGridError::Io(_) => "IO_ERROR",
            TapGridError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by repeating a capture or build step
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            TapGridError::FileReadError { .. }
                | TapGridError::FileWriteError { .. }
                | TapGridError::DirectoryCreateError { .. }
                | TapGridError::Io(_)
                | TapGridError::Serialization(_)
        )
    }

    /// Get a user-facing hint for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            TapGridError::TempoMissing => Some("Tap along with the song until the tempo is stable."),
            TapGridError::InsufficientTaps { .. } => Some("Keep tapping; the session was not reset."),
            TapGridError::UnstableTempo { .. } => {
                Some("Keep tapping steadily; the tempo locks once the taps settle.")
            }
            TapGridError::DriftExceeded { .. } => {
                Some("Tap drifted off the bar grid. Start the downbeat pass again on the \"1\".")
            }
            TapGridError::EmptyBarSequence => Some("Rebuild the bar grid with an anchor inside the audio before playback."),
            TapGridError::InvalidLoopRegion { .. } => {
                Some("Select a loop start and end inside the bar grid.")
            }
            TapGridError::InvalidTimeSignature { .. } => {
                Some("Use the form N/M, for example 4/4, 3/4, 6/8 or 2/4.")
            }
            TapGridError::MissingProjectName => Some("Give the project a name."),
            TapGridError::MissingAudioReference => Some("Select an audio file for the project."),
            TapGridError::ProjectNotFound { .. } => Some("List the stored projects to find its id."),
            _ => None,
        }
    }
}
