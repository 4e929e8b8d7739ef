//! Pre-evaluation audio quality checks.
//!
//! [`AudioQuality`] checks a 16 kHz mono PCM clip before it is streamed:
//!
//! | Check    | Description                                              |
//! |----------|----------------------------------------------------------|
//! | Duration | Clip must be within `[min_secs, max_secs]`               |
//! | Volume   | RMS must sit between a quiet floor and a clipping ceiling |
//! | Silence  | At most `max_silence_ratio` of samples may be near-silent |
//!
//! The engine itself will score a poor clip; these checks only let a caller
//! warn before spending a round trip.
//!
//! # Example
//!
//! ```rust
//! use twister_eval::audio::{samples_to_bytes, AudioError, AudioQuality};
//!
//! let validator = AudioQuality::new(0.5, 30.0);
//! let short = samples_to_bytes(&vec![3000_i16; 100]);
//! assert!(matches!(validator.validate(&short), Err(AudioError::TooShort { .. })));
//! ```

use thiserror::Error;

use super::pcm::{bytes_to_samples, SAMPLE_RATE};

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Reason an audio clip could not be loaded or failed validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    #[error("recording too short: {got_secs:.2}s (minimum {min_secs:.2}s)")]
    TooShort { min_secs: f32, got_secs: f32 },

    #[error("recording too long: {got_secs:.2}s (maximum {max_secs:.2}s)")]
    TooLong { max_secs: f32, got_secs: f32 },

    #[error("audio too quiet: RMS {rms:.0} (minimum {threshold:.0})")]
    TooQuiet { rms: f32, threshold: f32 },

    #[error("audio too loud, likely clipped: RMS {rms:.0} (maximum {threshold:.0})")]
    TooLoud { rms: f32, threshold: f32 },

    #[error("too much silence: {ratio_pct:.1}% of samples (maximum {max_pct:.1}%)")]
    MostlySilent { ratio_pct: f32, max_pct: f32 },

    #[error("cannot read audio file: {0}")]
    Read(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
}

// ---------------------------------------------------------------------------
// QualityReport
// ---------------------------------------------------------------------------

/// Raw measurements behind [`AudioQuality::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub duration_secs: f32,
    pub rms: f32,
    pub peak: i16,
    /// Fraction (0.0–1.0) of samples below 5% of the peak amplitude.
    pub silence_ratio: f32,
}

// ---------------------------------------------------------------------------
// AudioQuality
// ---------------------------------------------------------------------------

/// Validates a PCM clip before evaluation.
pub struct AudioQuality {
    /// Minimum allowed duration in seconds (default: `0.5`).
    pub min_recording_secs: f32,
    /// Maximum allowed duration in seconds (default: `30.0`).
    pub max_recording_secs: f32,
    /// RMS below this is too quiet (default: `1000`).
    pub min_rms: f32,
    /// RMS above this is treated as clipped (default: `20000`).
    pub max_rms: f32,
    /// Maximum near-silent fraction (default: `0.8`).
    pub max_silence_ratio: f32,
}

impl Default for AudioQuality {
    fn default() -> Self {
        Self {
            min_recording_secs: 0.5,
            max_recording_secs: 30.0,
            min_rms: 1000.0,
            max_rms: 20_000.0,
            max_silence_ratio: 0.8,
        }
    }
}

impl AudioQuality {
    /// Create a validator with the given duration limits and default
    /// volume thresholds.
    pub fn new(min_secs: f32, max_secs: f32) -> Self {
        Self {
            min_recording_secs: min_secs,
            max_recording_secs: max_secs,
            ..Default::default()
        }
    }

    /// Measure `pcm` (16 kHz mono little-endian `i16` bytes).
    pub fn analyze(&self, pcm: &[u8]) -> QualityReport {
        let samples = bytes_to_samples(pcm);
        let duration_secs = samples.len() as f32 / SAMPLE_RATE as f32;

        if samples.is_empty() {
            return QualityReport {
                duration_secs,
                rms: 0.0,
                peak: 0,
                silence_ratio: 1.0,
            };
        }

        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        let rms = (sum_sq / samples.len() as f64).sqrt() as f32;

        let peak = samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
            .min(i16::MAX as u16) as i16;

        let floor = peak as f32 * 0.05;
        let silent = samples
            .iter()
            .filter(|&&s| (s.unsigned_abs() as f32) < floor)
            .count();

        QualityReport {
            duration_secs,
            rms,
            peak,
            silence_ratio: silent as f32 / samples.len() as f32,
        }
    }

    /// Validate `pcm`.  Returns the first failing check:
    /// duration, then volume, then silence.
    pub fn validate(&self, pcm: &[u8]) -> Result<QualityReport, AudioError> {
        let report = self.analyze(pcm);

        if report.duration_secs < self.min_recording_secs {
            return Err(AudioError::TooShort {
                min_secs: self.min_recording_secs,
                got_secs: report.duration_secs,
            });
        }

        if report.duration_secs > self.max_recording_secs {
            return Err(AudioError::TooLong {
                max_secs: self.max_recording_secs,
                got_secs: report.duration_secs,
            });
        }

        if report.rms < self.min_rms {
            return Err(AudioError::TooQuiet {
                rms: report.rms,
                threshold: self.min_rms,
            });
        }

        if report.rms > self.max_rms {
            return Err(AudioError::TooLoud {
                rms: report.rms,
                threshold: self.max_rms,
            });
        }

        if report.silence_ratio > self.max_silence_ratio {
            return Err(AudioError::MostlySilent {
                ratio_pct: report.silence_ratio * 100.0,
                max_pct: self.max_silence_ratio * 100.0,
            });
        }

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
