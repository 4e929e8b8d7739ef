//! Transport seam and the per-attempt connection manager.
//!
//! # Overview
//!
//! [`Connector`] opens a connection and hands back a [`TransportPair`]: a
//! [`FrameSink`] for outgoing text/ping frames and a [`FrameStream`] of
//! incoming [`TransportEvent`]s.  Both traits are object-safe and `Send` so
//! production ([`WebSocketConnector`]) and scripted test transports plug in
//! behind `Arc<dyn Connector>`.
//!
//! [`ConnectionManager`] owns exactly one open connection:
//!
//! ```text
//!            send()                     ┌───────────────┐
//! caller ───────────▶ Arc<Mutex<sink>> ◀── heartbeat task (ping every N s)
//!                                       └───────────────┘
//! caller ◀── next_event() ── mpsc ◀── reader task ◀── FrameStream
//! ```
//!
//! Dropping the manager aborts both tasks, which drops both halves of the
//! connection.
//!
//! [`WebSocketConnector`]: super::WebSocketConnector

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Upper bound on a graceful close before the socket is simply dropped.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Errors raised by the transport layer.  Never retried here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("connection not ready within {0:?}")]
    ConnectTimeout(Duration),

    /// Handshake refused with HTTP 401/403.
    #[error("handshake rejected: {0}")]
    Auth(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    Send(String),
}

// ---------------------------------------------------------------------------
// CloseKind / TransportEvent
// ---------------------------------------------------------------------------

/// Classification of a connection close, reported upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Orderly close (1000).
    Normal,
    /// Connection lost without a closing handshake (1006 / reset / EOF).
    AbnormalDrop,
    /// Server going away or restarting (1001, 1012).
    ServerRestart,
    /// Any other close code.
    ServerError,
}

impl CloseKind {
    /// Classify a WebSocket close code; `None` means no close frame was seen.
    pub fn classify(code: Option<u16>) -> Self {
        match code {
            None | Some(1006) => CloseKind::AbnormalDrop,
            Some(1000) => CloseKind::Normal,
            Some(1001) | Some(1012) => CloseKind::ServerRestart,
            Some(_) => CloseKind::ServerError,
        }
    }
}

/// Something that happened on the inbound side of a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A complete text message (one server envelope).
    Text(String),
    /// The connection closed.  Always the last event.
    Closed {
        kind: CloseKind,
        code: Option<u16>,
        reason: String,
    },
    /// The transport failed.  Always the last event.
    Error(String),
}

impl TransportEvent {
    fn is_terminal(&self) -> bool {
        !matches!(self, TransportEvent::Text(_))
    }
}

// ---------------------------------------------------------------------------
// Transport traits
// ---------------------------------------------------------------------------

/// Outbound half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    async fn send_ping(&mut self) -> Result<(), TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Inbound half of a connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Next event, or `None` once the stream has ended.  Must be cancel-safe.
    async fn next_event(&mut self) -> Option<TransportEvent>;
}

/// Both halves of a freshly opened connection.
pub struct TransportPair {
    pub sink: Box<dyn FrameSink>,
    pub stream: Box<dyn FrameStream>,
}

/// Opens connections.  One call = one connection attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<TransportPair, TransportError>;
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

/// Owns one open connection plus its reader and heartbeat tasks.
pub struct ConnectionManager {
    sink: Arc<Mutex<Box<dyn FrameSink>>>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    open: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    heartbeat: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Open `url` through `connector`.
    ///
    /// # Errors
    ///
    /// - [`TransportError::ConnectTimeout`]: not ready within `connect_timeout`.
    /// - Whatever the connector reports otherwise.
    pub async fn open(
        connector: &dyn Connector,
        url: &str,
        connect_timeout: Duration,
        heartbeat_every: Duration,
    ) -> Result<Self, TransportError> {
        let pair = tokio::time::timeout(connect_timeout, connector.connect(url))
            .await
            .map_err(|_| TransportError::ConnectTimeout(connect_timeout))??;

        log::debug!("transport: connection open");

        let open = Arc::new(AtomicBool::new(true));
        let sink = Arc::new(Mutex::new(pair.sink));
        let (event_tx, events) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_loop(pair.stream, event_tx, Arc::clone(&open)));

        let heartbeat = (!heartbeat_every.is_zero()).then(|| {
            tokio::spawn(heartbeat_loop(
                Arc::clone(&sink),
                Arc::clone(&open),
                heartbeat_every,
            ))
        });

        Ok(Self {
            sink,
            events,
            open,
            reader,
            heartbeat,
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Send one text frame.  Fails fast with [`TransportError::NotConnected`]
    /// once the connection has closed.
    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        let result = self.sink.lock().await.send_text(text).await;
        if result.is_err() {
            self.open.store(false, Ordering::SeqCst);
        }
        result
    }

    /// Next inbound event.  `None` after the terminal event has been taken.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Next already-received event, without waiting.
    pub fn try_next_event(&mut self) -> Option<TransportEvent> {
        self.events.try_recv().ok()
    }

    /// Stop the heartbeat, close the connection and stop the reader.
    pub async fn close(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }

        if self.open.swap(false, Ordering::SeqCst) {
            let mut sink = self.sink.lock().await;
            match tokio::time::timeout(CLOSE_GRACE, sink.close()).await {
                Ok(Ok(())) => log::debug!("transport: closed"),
                Ok(Err(e)) => log::debug!("transport: close failed: {e}"),
                Err(_) => log::debug!("transport: close timed out; dropping socket"),
            }
        }

        self.reader.abort();
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        self.reader.abort();
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn read_loop(
    mut stream: Box<dyn FrameStream>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    open: Arc<AtomicBool>,
) {
    loop {
        let event = stream.next_event().await.unwrap_or(TransportEvent::Closed {
            kind: CloseKind::AbnormalDrop,
            code: None,
            reason: "stream ended".into(),
        });

        let terminal = event.is_terminal();
        if terminal {
            open.store(false, Ordering::SeqCst);
            log::debug!("transport: inbound stream finished: {event:?}");
        }

        if event_tx.send(event).is_err() || terminal {
            break;
        }
    }
}

async fn heartbeat_loop(
    sink: Arc<Mutex<Box<dyn FrameSink>>>,
    open: Arc<AtomicBool>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    loop {
        ticker.tick().await;
        if !open.load(Ordering::SeqCst) {
            break;
        }
        if let Err(e) = sink.lock().await.send_ping().await {
            log::warn!("transport: heartbeat failed: {e}");
            break;
        }
        log::trace!("transport: heartbeat sent");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
