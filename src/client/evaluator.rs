//! Session orchestrator: one `evaluate()` call, retried as whole attempts.
//!
//! # Flow
//!
//! ```text
//! evaluate(text, pcm)
//!   ├─ Busy        if another evaluate() holds the guard
//!   ├─ Cancelled   if dispose() was called
//!   ├─ InvalidInput on empty text / audio
//!   └─ for attempt in 1..=max_attempts
//!        Attempt::run  (fresh signature, fresh connection, fresh Session)
//!          ├─ Ok  ──▶ return ScoreResult
//!          └─ Err ──▶ Hardened + terminal error ──▶ return it
//!                     otherwise sleep(attempt × backoff) and go again
//!      all failed ──▶ RetryExhausted { attempts, last }
//! ```
//!
//! `dispose()` races every in-flight evaluation: the attempt future is
//! dropped, which tears down its connection, and `evaluate()` resolves with
//! [`EvaluationError::Cancelled`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};

use crate::config::{AppConfig, RetryPolicy};
use crate::error::EvaluationError;
use crate::protocol::Attempt;
use crate::scoring::ScoreResult;
use crate::transport::{Connector, WebSocketConnector};

/// Linear backoff before attempt `attempt + 1`.
pub fn backoff_delay(attempt: u32, unit_ms: u64) -> Duration {
    Duration::from_millis(u64::from(attempt).saturating_mul(unit_ms))
}

/// Evaluates target phrases against recorded audio.
///
/// One `Evaluator` runs at most one evaluation at a time; share it behind an
/// `Arc` if several tasks need it.
///
/// ```rust,no_run
/// use twister_eval::client::Evaluator;
/// use twister_eval::config::AppConfig;
///
/// # async fn example(pcm: Vec<u8>) -> Result<(), twister_eval::EvaluationError> {
/// let evaluator = Evaluator::with_websocket(AppConfig::load().unwrap_or_default());
/// let result = evaluator.evaluate("红鲤鱼与绿鲤鱼与驴", &pcm).await?;
/// println!("overall: {}", result.overall);
/// # Ok(())
/// # }
/// ```
pub struct Evaluator {
    config: AppConfig,
    connector: Arc<dyn Connector>,
    busy: Mutex<()>,
    disposed: watch::Sender<bool>,
}

impl Evaluator {
    pub fn new(config: AppConfig, connector: Arc<dyn Connector>) -> Self {
        let (disposed, _) = watch::channel(false);
        Self {
            config,
            connector,
            busy: Mutex::new(()),
            disposed,
        }
    }

    /// Evaluator over the production WebSocket transport.
    pub fn with_websocket(config: AppConfig) -> Self {
        Self::new(config, Arc::new(WebSocketConnector))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Cancel any in-flight evaluation and refuse all later ones.
    pub fn dispose(&self) {
        if !self.disposed.send_replace(true) {
            log::info!("session: evaluator disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.borrow()
    }

    /// Score `pcm` (16 kHz / 16-bit / mono, little-endian) read aloud
    /// against `target_text`.
    ///
    /// # Errors
    ///
    /// - [`EvaluationError::Busy`]: another evaluation is running.
    /// - [`EvaluationError::Cancelled`]: [`dispose`](Self::dispose) was called.
    /// - [`EvaluationError::InvalidInput`]: empty text or audio.
    /// - [`EvaluationError::RetryExhausted`]: every attempt failed.
    /// - Under [`RetryPolicy::Hardened`], the first terminal error as is.
    pub async fn evaluate(
        &self,
        target_text: &str,
        pcm: &[u8],
    ) -> Result<ScoreResult, EvaluationError> {
        let _guard = self.busy.try_lock().map_err(|_| EvaluationError::Busy)?;

        let mut disposed = self.disposed.subscribe();
        if *disposed.borrow_and_update() {
            return Err(EvaluationError::Cancelled);
        }

        if target_text.trim().is_empty() {
            return Err(EvaluationError::InvalidInput("target text is empty".into()));
        }
        if pcm.is_empty() {
            return Err(EvaluationError::InvalidInput("audio buffer is empty".into()));
        }

        tokio::select! {
            outcome = self.run_attempts(target_text, pcm) => outcome,
            _ = wait_disposed(&mut disposed) => {
                log::info!("session: evaluation cancelled");
                Err(EvaluationError::Cancelled)
            }
        }
    }

    async fn run_attempts(
        &self,
        target_text: &str,
        pcm: &[u8],
    ) -> Result<ScoreResult, EvaluationError> {
        let session = &self.config.session;
        let max_attempts = session.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            log::info!("session: attempt {attempt}/{max_attempts}");

            match Attempt::new(&self.config)
                .run(self.connector.as_ref(), target_text, pcm)
                .await
            {
                Ok(result) => {
                    log::info!(
                        "session: scored on attempt {attempt} (overall {})",
                        result.overall
                    );
                    return Ok(result);
                }
                Err(e) => {
                    log::warn!("session: attempt {attempt}/{max_attempts} failed: {e}");

                    if session.retry_policy == RetryPolicy::Hardened && e.is_terminal() {
                        return Err(e);
                    }
                    last_error = Some(e);

                    if attempt < max_attempts {
                        let delay = backoff_delay(attempt, session.backoff_ms);
                        log::debug!("session: retrying in {delay:?}");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let last = last_error
            .unwrap_or_else(|| EvaluationError::Protocol("no attempt was made".into()));
        log::error!("session: giving up after {max_attempts} attempts: {last}");
        Err(EvaluationError::RetryExhausted {
            attempts: max_attempts,
            last: Box::new(last),
        })
    }
}

async fn wait_disposed(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
