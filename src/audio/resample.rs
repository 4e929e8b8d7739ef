//! Resampling and channel mixing for 16-bit PCM.
//!
//! The scoring engine requires **16 kHz mono `i16`** audio.  This module
//! provides the two conversion steps used when loading arbitrary WAV files:
//!
//! 1. [`downmix_to_mono`]: average any number of interleaved channels.
//! 2. [`resample_to_16k`]: resample from any source rate to 16 000 Hz
//!    using linear interpolation.

use super::pcm::SAMPLE_RATE;

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`.  `channels == 0` yields
/// an empty vector.
///
/// # Example
///
/// ```rust
/// use twister_eval::audio::downmix_to_mono;
///
/// let stereo = vec![1000_i16, -1000, 200, 400]; // L R L R
/// assert_eq!(downmix_to_mono(&stereo, 2), vec![0, 300]);
/// ```
pub fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / n as i32) as i16
                })
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample_to_16k
// ---------------------------------------------------------------------------

/// Resample `samples` from `source_rate` Hz to 16 000 Hz.
///
/// * `source_rate == 16_000` returns the input unchanged.
/// * Empty input or a zero rate returns an empty vector.
///
/// Output length is `ceil(samples.len() * 16_000 / source_rate)`.
pub fn resample_to_16k(samples: &[i16], source_rate: u32) -> Vec<i16> {
    if source_rate == SAMPLE_RATE {
        return samples.to_vec();
    }

    if samples.is_empty() || source_rate == 0 {
        return Vec::new();
    }

    let ratio = SAMPLE_RATE as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] as f64 * (1.0 - frac) + samples[idx + 1] as f64 * frac
        } else if idx < samples.len() {
            samples[idx] as f64
        } else {
            0.0
        };

        output.push(sample.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
