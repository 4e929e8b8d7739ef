//! Audio file loading.
//!
//! WAV files of any common layout are converted to the engine format
//! (16 kHz / 16-bit / mono); files with any other extension are taken to be
//! headerless PCM already in that format.

use std::path::Path;

use hound::{SampleFormat, WavReader};

use super::pcm::samples_to_bytes;
use super::quality::AudioError;
use super::resample::{downmix_to_mono, resample_to_16k};

/// Load `path` as engine-format PCM bytes, dispatching on the extension.
pub fn load_audio_file(path: &Path) -> Result<Vec<u8>, AudioError> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    if is_wav {
        load_wav(path)
    } else {
        let pcm = std::fs::read(path).map_err(|e| AudioError::Read(e.to_string()))?;
        if pcm.len() % 2 != 0 {
            log::warn!(
                "audio: {} has an odd byte count; last byte will be ignored",
                path.display()
            );
        }
        Ok(pcm)
    }
}

/// Read a WAV file, downmix to mono and resample to 16 kHz.
pub fn load_wav(path: &Path) -> Result<Vec<u8>, AudioError> {
    let reader = WavReader::open(path).map_err(|e| AudioError::Read(e.to_string()))?;
    let spec = reader.spec();

    log::debug!(
        "audio: {}: {} Hz, {} ch, {}-bit {:?}",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let read_err = |e: hound::Error| AudioError::Read(e.to_string());

    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .collect::<Result<_, _>>()
            .map_err(read_err)?,
        (SampleFormat::Int, bits @ 1..=32) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| scale_to_i16(v, bits)))
            .collect::<Result<_, _>>()
            .map_err(read_err)?,
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()
            .map_err(read_err)?,
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{bits}-bit {format:?}"
            )))
        }
    };

    let mono = downmix_to_mono(&interleaved, spec.channels);
    let resampled = resample_to_16k(&mono, spec.sample_rate);
    Ok(samples_to_bytes(&resampled))
}

fn scale_to_i16(value: i32, bits: u16) -> i16 {
    if bits >= 16 {
        (value >> (bits - 16)) as i16
    } else {
        (value << (16 - bits)) as i16
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::bytes_to_samples;
    use hound::{WavSpec, WavWriter};
    use tempfile::tempdir;

    fn write_wav(path: &Path, rate: u32, channels: u16, frames: usize, value: i16) {
        let spec = WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * channels as usize {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn engine_format_wav_is_passed_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono16k.wav");
        write_wav(&path, 16_000, 1, 16_000, 1234);

        let pcm = load_wav(&path).unwrap();
        assert_eq!(pcm.len(), 32_000);
        assert!(bytes_to_samples(&pcm).iter().all(|&s| s == 1234));
    }

    #[test]
    fn stereo_48k_is_converted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo48k.wav");
        write_wav(&path, 48_000, 2, 48_000, 800);

        let samples = bytes_to_samples(&load_wav(&path).unwrap());
        assert_eq!(samples.len(), 16_000);
        assert!(samples.iter().all(|&s| s == 800));
    }

    #[test]
    fn float_wav_is_scaled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..160 {
            writer.write_sample(0.5_f32).unwrap();
        }
        writer.finalize().unwrap();

        let samples = bytes_to_samples(&load_wav(&path).unwrap());
        assert_eq!(samples.len(), 160);
        assert!(samples.iter().all(|&s| (s - 16_383).abs() <= 1));
    }

    #[test]
    fn raw_pcm_extension_is_read_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.pcm");
        std::fs::write(&path, [1u8, 2, 3, 4]).unwrap();
        assert_eq!(load_audio_file(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_audio_file(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, AudioError::Read(_)));
    }

    #[test]
    fn scale_handles_narrow_and_wide_samples() {
        assert_eq!(scale_to_i16(127, 8), 127 << 8);
        assert_eq!(scale_to_i16(0x7F_FF00, 24), i16::MAX);
        assert_eq!(scale_to_i16(-(1 << 23), 24), i16::MIN);
    }
}
