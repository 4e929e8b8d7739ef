//! Error taxonomy surfaced to callers of [`Evaluator::evaluate`].
//!
//! [`Evaluator::evaluate`]: crate::client::Evaluator::evaluate

use std::time::Duration;

use thiserror::Error;

use crate::auth::SignError;
use crate::transport::TransportError;

/// Everything that can end an evaluation without a score.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The handshake did not complete within the connect bound.
    #[error("connection not ready within {0:?}")]
    ConnectTimeout(Duration),

    /// The connection failed, dropped, or closed before a final result.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server refused the credentials or signature.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The exchange could not make progress (e.g. a final envelope with no
    /// payload, or an out-of-order state transition).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server answered with a nonzero top-level code.
    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },

    /// The server explicitly rejected the utterance (status 3).
    #[error("evaluation rejected by server: {0}")]
    Rejected(String),

    /// No final envelope arrived within the result-wait bound.
    #[error("no final result within {0:?}")]
    ResultTimeout(Duration),

    /// Every attempt failed; `last` is the final attempt's error.
    #[error("evaluation failed after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<EvaluationError>,
    },

    /// Empty target text or empty audio.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Another `evaluate()` is already running on this client.
    #[error("an evaluation is already running on this client")]
    Busy,

    /// The client was disposed while (or before) evaluating.
    #[error("evaluation cancelled")]
    Cancelled,
}

impl EvaluationError {
    /// `true` for errors that re-running the same request cannot change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EvaluationError::Auth(_)
                | EvaluationError::Rejected(_)
                | EvaluationError::InvalidInput(_)
                | EvaluationError::Busy
                | EvaluationError::Cancelled
        )
    }
}

impl From<TransportError> for EvaluationError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::ConnectTimeout(bound) => EvaluationError::ConnectTimeout(bound),
            TransportError::Auth(msg) => EvaluationError::Auth(msg),
            other => EvaluationError::Transport(other.to_string()),
        }
    }
}

impl From<SignError> for EvaluationError {
    fn from(e: SignError) -> Self {
        match e {
            SignError::Hmac(_) => EvaluationError::Auth(e.to_string()),
            SignError::Endpoint { .. } => EvaluationError::InvalidInput(e.to_string()),
        }
    }
}
