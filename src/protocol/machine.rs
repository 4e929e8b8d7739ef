//! One evaluation attempt, from signing to final envelope.
//!
//! ```text
//! sign ─▶ open ─▶ config ─▶ settle ─▶ audio × N (paced) ─▶ await final
//!                                                           │
//!                         status 1 / 4 / malformed ◀────────┤ ignored
//!                         status 2 + payload ◀──────────────┤ Completed
//!                         status 3 ◀────────────────────────┤ Rejected
//!          nonzero code / close / error / timeout ◀─────────┘ Failed
//! ```
//!
//! The connection is closed before [`Attempt::run`] returns, whatever the
//! outcome.

use chrono::Utc;

use super::messages::{AudioMessage, ConfigMessage, EnvelopeStatus, ServerEnvelope};
use super::state::{Session, SessionState};
use crate::audio::AudioFramer;
use crate::auth::sign_endpoint;
use crate::config::AppConfig;
use crate::error::EvaluationError;
use crate::scoring::{parse_envelope, ScoreResult};
use crate::transport::{ConnectionManager, Connector, TransportEvent};

/// Drives a single attempt.  Construct a new one per attempt.
pub struct Attempt<'a> {
    config: &'a AppConfig,
    session: Session,
}

impl<'a> Attempt<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the attempt to a terminal state.
    pub async fn run(
        &mut self,
        connector: &dyn Connector,
        target_text: &str,
        pcm: &[u8],
    ) -> Result<ScoreResult, EvaluationError> {
        let outcome = self.connect_and_exchange(connector, target_text, pcm).await;
        if outcome.is_err() {
            self.session.fail();
        }
        log::debug!(
            "session: attempt ended in {} after {} ms",
            self.session.state().label(),
            self.session.elapsed_ms()
        );
        outcome
    }

    async fn connect_and_exchange(
        &mut self,
        connector: &dyn Connector,
        target_text: &str,
        pcm: &[u8],
    ) -> Result<ScoreResult, EvaluationError> {
        let timing = &self.config.session;

        self.session.advance(SessionState::Connecting)?;
        let endpoint = sign_endpoint(Utc::now(), &self.config.credentials, "GET")?;
        log::debug!("session: signed for {}", endpoint.date());
        let mut conn = ConnectionManager::open(
            connector,
            endpoint.url(),
            timing.connect_timeout(),
            timing.heartbeat_interval(),
        )
        .await?;

        let outcome = self.exchange(&mut conn, target_text, pcm).await;
        conn.close().await;
        outcome
    }

    async fn exchange(
        &mut self,
        conn: &mut ConnectionManager,
        target_text: &str,
        pcm: &[u8],
    ) -> Result<ScoreResult, EvaluationError> {
        let config = self.config;

        let frame = ConfigMessage::new(&config.credentials.app_id, &config.engine, target_text)
            .to_json()
            .map_err(encode_error)?;
        send(conn, frame).await?;
        self.session.advance(SessionState::ConfigSent)?;

        // no explicit ack; give the engine time to set up
        tokio::time::sleep(config.session.settle_delay()).await;

        self.session.advance(SessionState::StreamingAudio)?;
        self.stream_audio(conn, pcm).await?;

        self.session.advance(SessionState::AwaitingResult)?;
        self.await_result(conn).await
    }

    async fn stream_audio(
        &mut self,
        conn: &mut ConnectionManager,
        pcm: &[u8],
    ) -> Result<(), EvaluationError> {
        let framer = AudioFramer::new(pcm, self.config.audio.chunk_bytes);
        let pacing = self.config.audio.pacing();

        log::debug!(
            "session: streaming {} bytes in {} frames",
            pcm.len(),
            framer.frame_count()
        );

        for frame in framer.frames() {
            self.session.record_frame(&frame)?;
            let message = AudioMessage::from_frame(&frame)
                .to_json()
                .map_err(encode_error)?;
            send(conn, message).await?;

            if !frame.position.is_last() && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }

        if !self.session.last_sent() {
            return Err(EvaluationError::Protocol(
                "audio stream ended without a last frame".into(),
            ));
        }
        Ok(())
    }

    async fn await_result(
        &mut self,
        conn: &mut ConnectionManager,
    ) -> Result<ScoreResult, EvaluationError> {
        let bound = self.config.session.result_timeout();

        let outcome = tokio::time::timeout(bound, async {
            loop {
                match conn.next_event().await {
                    Some(TransportEvent::Text(text)) => {
                        if let Some(resolved) = dispatch_envelope(&text) {
                            return resolved;
                        }
                    }
                    Some(TransportEvent::Closed { kind, code, reason }) => {
                        return Err(EvaluationError::Transport(format!(
                            "connection closed before final result: {kind:?} (code {code:?}) {reason}"
                        )))
                    }
                    Some(TransportEvent::Error(e)) => return Err(EvaluationError::Transport(e)),
                    None => {
                        return Err(EvaluationError::Transport(
                            "connection event stream ended".into(),
                        ))
                    }
                }
            }
        })
        .await
        .unwrap_or_else(|_| Err(EvaluationError::ResultTimeout(bound)));

        match &outcome {
            Ok(_) => self.session.advance(SessionState::Completed)?,
            Err(EvaluationError::Rejected(_)) => self.session.advance(SessionState::Rejected)?,
            Err(_) => {}
        }
        outcome
    }
}

/// Interpret one inbound text frame while awaiting the result.
///
/// `None` means "keep waiting": interim (1) and empty (4) envelopes, unknown
/// statuses, and frames that do not parse at all.
pub fn dispatch_envelope(text: &str) -> Option<Result<ScoreResult, EvaluationError>> {
    let envelope = match ServerEnvelope::parse(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::warn!("session: ignoring malformed envelope: {e}");
            return None;
        }
    };

    if envelope.code() != 0 {
        return Some(Err(EvaluationError::Server {
            code: envelope.code(),
            message: envelope.message_or_default(),
        }));
    }

    match envelope.status() {
        Some(EnvelopeStatus::Final) => {
            log::info!(
                "session: final result received (sid {})",
                envelope.sid.as_deref().unwrap_or("-")
            );
            Some(parse_envelope(&envelope).map_err(|e| EvaluationError::Protocol(e.to_string())))
        }
        Some(EnvelopeStatus::Rejected) => {
            Some(Err(EvaluationError::Rejected(envelope.message_or_default())))
        }
        Some(EnvelopeStatus::Interim) => {
            log::debug!("session: interim envelope ignored");
            None
        }
        Some(EnvelopeStatus::Empty) => {
            log::debug!("session: empty envelope ignored");
            None
        }
        None => {
            log::debug!("session: envelope without a known status ignored");
            None
        }
    }
}

/// Send one frame.  When the send fails because the server already hung up,
/// prefer the server's own error envelope (if one arrived) over the bare
/// transport error.
async fn send(conn: &mut ConnectionManager, frame: String) -> Result<(), EvaluationError> {
    match conn.send(frame).await {
        Ok(()) => Ok(()),
        Err(e) => {
            while let Some(event) = conn.try_next_event() {
                if let TransportEvent::Text(text) = event {
                    if let Some(Err(server_error)) = dispatch_envelope(&text) {
                        return Err(server_error);
                    }
                }
            }
            Err(e.into())
        }
    }
}

fn encode_error(e: serde_json::Error) -> EvaluationError {
    EvaluationError::Protocol(format!("cannot encode message: {e}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
