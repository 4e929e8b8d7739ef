//! 16 kHz / 16-bit / mono little-endian PCM, the only format the scoring
//! engine accepts (`audio/L16;rate=16000`).

/// Samples per second.
pub const SAMPLE_RATE: u32 = 16_000;

/// Bytes per sample (16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Encode samples as little-endian bytes.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode little-endian bytes into samples.  A trailing odd byte is ignored.
pub fn bytes_to_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

/// Playback length of a PCM byte buffer in seconds.
pub fn duration_secs(pcm: &[u8]) -> f32 {
    (pcm.len() / BYTES_PER_SAMPLE) as f32 / SAMPLE_RATE as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        let samples = [0i16, 1, -1, i16::MAX, i16::MIN];
        let bytes = samples_to_bytes(&samples);
        assert_eq!(bytes.len(), 10);
        assert_eq!(&bytes[2..4], &[1, 0]);
        assert_eq!(bytes_to_samples(&bytes), samples);
    }

    #[test]
    fn odd_trailing_byte_ignored() {
        assert_eq!(bytes_to_samples(&[1, 0, 7]), vec![1]);
    }

    #[test]
    fn three_seconds_duration() {
        let pcm = vec![0u8; 96_000];
        assert!((duration_secs(&pcm) - 3.0).abs() < f32::EPSILON);
    }
}
