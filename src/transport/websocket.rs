//! WebSocket transport over `tokio-tungstenite` (TLS via rustls).

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::connection::{
    CloseKind, Connector, FrameSink, FrameStream, TransportError, TransportEvent, TransportPair,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production [`Connector`]: one `connect_async` handshake per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<TransportPair, TransportError> {
        let (ws, response) = connect_async(url).await.map_err(map_connect_error)?;
        log::debug!("transport: handshake complete (HTTP {})", response.status());

        let (sink, stream) = ws.split();
        Ok(TransportPair {
            sink: Box::new(WsSink { inner: sink }),
            stream: Box::new(WsSource { inner: stream }),
        })
    }
}

fn map_connect_error(err: tungstenite::Error) -> TransportError {
    match &err {
        tungstenite::Error::Http(resp) => {
            let status = resp.status().as_u16();
            let body = resp
                .body()
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            if status == 401 || status == 403 {
                TransportError::Auth(format!("HTTP {status}: {body}"))
            } else {
                TransportError::Connect(format!("HTTP {status}: {body}"))
            }
        }
        _ => TransportError::Connect(err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.inner
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

struct WsSource {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl FrameStream for WsSource {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            let event = match self.inner.next().await? {
                Ok(Message::Text(text)) => TransportEvent::Text(text.to_string()),
                Ok(Message::Binary(bytes)) => {
                    TransportEvent::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                Ok(Message::Close(frame)) => {
                    let code = frame.as_ref().map(|f| u16::from(f.code));
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    TransportEvent::Closed {
                        kind: CloseKind::classify(code),
                        code,
                        reason,
                    }
                }
                // pongs are answered by tungstenite on read
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return None
                }
                Err(
                    e @ (tungstenite::Error::Io(_)
                    | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)),
                ) => TransportEvent::Closed {
                    kind: CloseKind::AbnormalDrop,
                    code: None,
                    reason: e.to_string(),
                },
                Err(e) => TransportEvent::Error(e.to_string()),
            };
            return Some(event);
        }
    }
}
