//! WAV duration probing
//!
//! Only the header is read; samples are never decoded.

use std::path::Path;

use crate::error::{Result, TapGridError};

/// Duration of a WAV file in milliseconds
pub fn probe_wav_duration_ms(path: &Path) -> Result<f64> {
    let reader = hound::WavReader::open(path).map_err(|e| TapGridError::AudioProbe {
        path: path.to_path_buf(),
        reason: format!("Failed to open WAV file: {}", e),
    })?;

    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(TapGridError::AudioProbe {
            path: path.to_path_buf(),
            reason: "sample rate is zero".to_string(),
        });
    }

    // duration() counts frames, not interleaved samples
    let frames = reader.duration() as f64;
    let duration_ms = frames / spec.sample_rate as f64 * 1000.0;
    log::debug!(
        "[AUDIO] {}: {} Hz, {} ch, {:.1} ms",
        path.display(),
        spec.sample_rate,
        spec.channels,
        duration_ms
    );
    Ok(duration_ms)
}
