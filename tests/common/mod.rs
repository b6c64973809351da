//! Shared test utilities: an in-memory connector and a recording sink.

#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use tickwise::config::EngineConfig;
use tickwise::models::PriceTick;
use tickwise::websocket::{ConnectionEvent, ConnectionState, Connector, Link, TickSink};

/// Live public feed endpoint.
pub const FEED_WS_URL: &str = "wss://ws-feed.exchange.coinbase.com";

pub fn test_config() -> EngineConfig {
    EngineConfig::new(
        "wss://feed.test",
        vec!["BTC-USD".to_string(), "ETH-USD".to_string()],
    )
}

#[derive(Default)]
struct MockState {
    opened_urls: Vec<String>,
    senders: Vec<mpsc::UnboundedSender<ConnectionEvent>>,
    sent: Vec<String>,
    closes: usize,
}

/// Connector that records every open and lets the test play socket events.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opened_urls.len()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().opened_urls.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    /// Frames sent through any link, in order.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Delivers an event on the most recently opened connection.
    /// Returns `false` if the ingestor no longer listens to it.
    pub fn emit(&self, event: ConnectionEvent) -> bool {
        let state = self.state.lock().unwrap();
        state
            .senders
            .last()
            .is_some_and(|tx| tx.send(event).is_ok())
    }
}

impl Connector for MockConnector {
    type Link = MockLink;

    fn open(&self, url: &str, events: mpsc::UnboundedSender<ConnectionEvent>) -> MockLink {
        let mut state = self.state.lock().unwrap();
        state.opened_urls.push(url.to_string());
        state.senders.push(events);
        MockLink {
            state: Arc::clone(&self.state),
        }
    }
}

pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl Link for MockLink {
    fn send(&mut self, text: String) {
        self.state.lock().unwrap().sent.push(text);
    }

    fn close(&mut self) -> impl Future<Output = ()> + Send {
        self.state.lock().unwrap().closes += 1;
        std::future::ready(())
    }
}

/// Sink forwarding every tick into a channel the test can await.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<PriceTick>,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PriceTick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl TickSink for RecordingSink {
    fn on_tick(&self, tick: PriceTick) {
        let _ = self.tx.send(tick);
    }
}

/// Waits (in virtual time when paused) until the state equals `target`.
pub async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, target: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(600), rx.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {target:?}"))
        .expect("ingestor dropped its state sender");
}
