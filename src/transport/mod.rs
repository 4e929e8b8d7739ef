//! Connection management: one WebSocket connection per attempt.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use twister_eval::transport::{ConnectionManager, TransportEvent, WebSocketConnector};
//!
//! # async fn example() -> Result<(), twister_eval::transport::TransportError> {
//! let mut conn = ConnectionManager::open(
//!     &WebSocketConnector,
//!     "wss://example.invalid/v2/open-ise",
//!     Duration::from_secs(15),
//!     Duration::from_secs(30),
//! )
//! .await?;
//!
//! conn.send(r#"{"hello":1}"#.to_string()).await?;
//! while let Some(event) = conn.next_event().await {
//!     if let TransportEvent::Text(text) = event {
//!         println!("{text}");
//!     }
//! }
//! conn.close().await;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{
    CloseKind, ConnectionManager, Connector, FrameSink, FrameStream, TransportError,
    TransportEvent, TransportPair,
};
pub use websocket::WebSocketConnector;
