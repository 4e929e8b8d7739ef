//! Scripted in-memory transport for unit tests.
//!
//! Each call to [`ScriptedConnector::connect`] consumes the next
//! [`AttemptScript`].  Replies are pushed into the inbound stream when the
//! script's [`Trigger`] fires; with no terminal reply the stream simply stays
//! open, which is how result timeouts are exercised.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::connection::{
    Connector, FrameSink, FrameStream, TransportError, TransportEvent, TransportPair,
};

/// When a connection's scripted replies are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// As soon as the connection opens.
    OnConnect,
    /// After the first outbound text frame.
    OnFirstSend,
    /// After the outbound frame whose `data.status` is 2.
    OnLastFrame,
}

/// Behaviour of one connection attempt.
#[derive(Debug, Clone)]
pub enum AttemptScript {
    FailConnect(TransportError),
    /// `connect` never resolves.
    Hang,
    Connect {
        trigger: Trigger,
        replies: Vec<TransportEvent>,
    },
}

#[derive(Default)]
struct Recorded {
    urls: Vec<String>,
    sent: Vec<Vec<String>>,
    inbound: Vec<Option<mpsc::UnboundedSender<TransportEvent>>>,
    pings: usize,
    closes: usize,
}

type Shared = Arc<Mutex<Recorded>>;

pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<AttemptScript>>,
    recorded: Shared,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<AttemptScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            recorded: Arc::default(),
        }
    }

    /// Number of `connect` calls so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.recorded.lock().unwrap().urls.len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.recorded.lock().unwrap().urls.clone()
    }

    /// Text frames sent on the `n`th opened connection (0-based).
    pub fn sent(&self, connection: usize) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap()
            .sent
            .get(connection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn pings(&self) -> usize {
        self.recorded.lock().unwrap().pings
    }

    pub fn closes(&self) -> usize {
        self.recorded.lock().unwrap().closes
    }

    /// End the inbound stream of the `n`th opened connection.
    pub fn end_stream(&self, connection: usize) {
        if let Some(slot) = self.recorded.lock().unwrap().inbound.get_mut(connection) {
            slot.take();
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<TransportPair, TransportError> {
        self.recorded.lock().unwrap().urls.push(url.to_string());

        let script = self.scripts.lock().unwrap().pop_front();
        let (trigger, replies) = match script {
            Some(AttemptScript::FailConnect(e)) => return Err(e),
            Some(AttemptScript::Hang) => std::future::pending().await,
            Some(AttemptScript::Connect { trigger, replies }) => (trigger, replies),
            None => return Err(TransportError::Connect("no script left".into())),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let index = {
            let mut rec = self.recorded.lock().unwrap();
            rec.sent.push(Vec::new());
            rec.inbound.push(Some(tx));
            rec.sent.len() - 1
        };

        let mut sink = ScriptedSink {
            index,
            trigger,
            pending: Some(replies),
            recorded: Arc::clone(&self.recorded),
        };
        if trigger == Trigger::OnConnect {
            sink.deliver();
        }

        Ok(TransportPair {
            sink: Box::new(sink),
            stream: Box::new(ScriptedStream { rx }),
        })
    }
}

struct ScriptedSink {
    index: usize,
    trigger: Trigger,
    pending: Option<Vec<TransportEvent>>,
    recorded: Shared,
}

impl ScriptedSink {
    fn deliver(&mut self) {
        let Some(replies) = self.pending.take() else {
            return;
        };
        let rec = self.recorded.lock().unwrap();
        if let Some(Some(tx)) = rec.inbound.get(self.index) {
            for reply in replies {
                let _ = tx.send(reply);
            }
        }
    }
}

fn is_last_frame(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v["data"]["status"].as_i64())
        == Some(2)
}

#[async_trait]
impl FrameSink for ScriptedSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let fire = match self.trigger {
            Trigger::OnConnect => false,
            Trigger::OnFirstSend => true,
            Trigger::OnLastFrame => is_last_frame(&text),
        };
        self.recorded.lock().unwrap().sent[self.index].push(text);
        if fire {
            self.deliver();
        }
        Ok(())
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.recorded.lock().unwrap().pings += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.recorded.lock().unwrap().closes += 1;
        Ok(())
    }
}

struct ScriptedStream {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl FrameStream for ScriptedStream {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}
