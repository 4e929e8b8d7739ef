//! Streaming pronunciation-evaluation client.
//!
//! ```text
//! Evaluator::evaluate(text, pcm)
//!   └─ Attempt (× up to max_attempts)
//!        sign_endpoint ─▶ ConnectionManager ─▶ ConfigMessage ─▶ AudioFramer frames
//!                                           ◀─ ServerEnvelope ─▶ parse_envelope ─▶ ScoreResult
//! ```

pub mod audio;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod scoring;
pub mod transport;

pub use client::Evaluator;
pub use error::EvaluationError;
pub use scoring::{Grade, Score, ScoreResult};
