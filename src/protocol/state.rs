//! Per-attempt session state.
//!
//! [`SessionState`] is the protocol phase of one connection attempt.  A
//! [`Session`] owns it together with the streaming bookkeeping and refuses
//! to move backwards; a retry starts over with a fresh `Session`.

use std::time::Instant;

use crate::audio::AudioFrame;
use crate::error::EvaluationError;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Phases of one evaluation attempt.
///
/// ```text
/// Idle ──▶ Connecting ──▶ ConfigSent ──▶ StreamingAudio ──▶ AwaitingResult
///                                                           ├─ final ──▶ Completed
///                                                           └─ status 3 ─▶ Rejected
/// any non-terminal state ──error / close / timeout──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Constructed; nothing sent.
    #[default]
    Idle,

    /// Endpoint signed; waiting for the transport to open.
    Connecting,

    /// Config message sent; settling before audio.
    ConfigSent,

    /// Audio chunks are being sent.
    StreamingAudio,

    /// Last chunk sent; waiting for the final envelope.
    AwaitingResult,

    /// A final result was parsed.
    Completed,

    /// The server rejected the utterance.
    Rejected,

    /// The attempt ended without a result.
    Failed,
}

impl SessionState {
    /// Returns `true` once the attempt has resolved.
    ///
    /// ```
    /// use twister_eval::protocol::SessionState;
    ///
    /// assert!(!SessionState::StreamingAudio.is_terminal());
    /// assert!(SessionState::Completed.is_terminal());
    /// assert!(SessionState::Failed.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Rejected | SessionState::Failed
        )
    }

    /// A short human-readable label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Connecting => "Connecting",
            SessionState::ConfigSent => "ConfigSent",
            SessionState::StreamingAudio => "StreamingAudio",
            SessionState::AwaitingResult => "AwaitingResult",
            SessionState::Completed => "Completed",
            SessionState::Rejected => "Rejected",
            SessionState::Failed => "Failed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SessionState::Idle => 0,
            SessionState::Connecting => 1,
            SessionState::ConfigSent => 2,
            SessionState::StreamingAudio => 3,
            SessionState::AwaitingResult => 4,
            SessionState::Completed | SessionState::Rejected | SessionState::Failed => 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Bookkeeping for one attempt.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    /// Byte offset of the last chunk sent.
    chunk_cursor: Option<usize>,
    first_sent: bool,
    last_sent: bool,
    started_at: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            chunk_cursor: None,
            first_sent: false,
            last_sent: false,
            started_at: Instant::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn chunk_cursor(&self) -> Option<usize> {
        self.chunk_cursor
    }

    pub fn first_sent(&self) -> bool {
        self.first_sent
    }

    pub fn last_sent(&self) -> bool {
        self.last_sent
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Move to `next`.  Only strictly forward moves out of a non-terminal
    /// state are allowed.
    pub fn advance(&mut self, next: SessionState) -> Result<(), EvaluationError> {
        if self.state.is_terminal() || next.rank() <= self.state.rank() {
            return Err(EvaluationError::Protocol(format!(
                "illegal transition {} -> {}",
                self.state.label(),
                next.label()
            )));
        }
        log::debug!("session: {} -> {}", self.state.label(), next.label());
        self.state = next;
        Ok(())
    }

    /// Mark the attempt failed unless it has already resolved.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            log::debug!("session: {} -> Failed", self.state.label());
            self.state = SessionState::Failed;
        }
    }

    /// Record that `frame` was sent.  Offsets must strictly increase and
    /// nothing may follow the last frame.
    pub fn record_frame(&mut self, frame: &AudioFrame<'_>) -> Result<(), EvaluationError> {
        if self.state != SessionState::StreamingAudio {
            return Err(EvaluationError::Protocol(format!(
                "audio frame sent in state {}",
                self.state.label()
            )));
        }
        if self.last_sent {
            return Err(EvaluationError::Protocol("audio frame after last frame".into()));
        }
        if self.chunk_cursor.is_some_and(|prev| frame.offset <= prev) {
            return Err(EvaluationError::Protocol(format!(
                "audio frame offset {} does not follow {:?}",
                frame.offset, self.chunk_cursor
            )));
        }

        self.chunk_cursor = Some(frame.offset);
        self.first_sent = true;
        self.last_sent = frame.position.is_last();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
