//! Async WebSocket client for the ticker feed.
//!
//! This module is organized by concern:
//! - [`connection`] - Connection state machine and reconnect handling
//! - [`subscription`] - Channel subscribe requests
//! - [`handler`] - Incoming message parsing

pub mod connection;
pub mod handler;
mod subscription;

use futures_util::StreamExt;
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;
use tungstenite::Message;

use crate::Result;

pub use connection::{
    ConnectionEvent, ConnectionState, Connector, IngestorHandle, Link, TickIngestor, TickSink,
    WsConnector, WsLink,
};
pub use handler::{Inbound, parse_message};
pub use subscription::{subscribe, ticker_subscription};

/// Write half of a feed connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a feed connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns a [`TickwiseError`](crate::TickwiseError) if the connection or TLS handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = connect_async(url).await?;
    info!(url, "WebSocket handshake completed");

    Ok(ws_stream.split())
}
