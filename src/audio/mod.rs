//! Audio input: file loading → format conversion → quality check → framing.
//!
//! # Pipeline
//!
//! ```text
//! WAV / raw PCM file → load_audio_file → downmix_to_mono → resample_to_16k
//!                    → AudioQuality (optional pre-flight) → AudioFramer
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use twister_eval::audio::{AudioFramer, FramePosition};
//!
//! let pcm = vec![0u8; 96_000]; // 3 s at 16 kHz / 16-bit mono
//! let framer = AudioFramer::new(&pcm, 2560);
//! let frames: Vec<_> = framer.frames().collect();
//! assert_eq!(frames.len(), 38);
//! assert_eq!(frames[37].position, FramePosition::Last);
//! ```

pub mod framer;
pub mod pcm;
pub mod quality;
pub mod resample;
pub mod wav;

pub use framer::{AudioFrame, AudioFramer, FramePosition, Frames};
pub use pcm::{bytes_to_samples, duration_secs, samples_to_bytes, SAMPLE_RATE};
pub use quality::{AudioError, AudioQuality, QualityReport};
pub use resample::{downmix_to_mono, resample_to_16k};
pub use wav::{load_audio_file, load_wav};
