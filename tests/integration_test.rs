//! Live feed integration tests.
//!
//! These tests connect to the public ticker feed and require network access.
//! Run with: `cargo test --features integration-tests`

#![cfg(feature = "integration-tests")]

mod common;

use std::time::Duration;

use futures_util::StreamExt;
use tickwise::EngineFacade;
use tickwise::config::EngineConfig;
use tickwise::models::Channel;
use tickwise::websocket::{ConnectionState, connect, subscribe};

use common::FEED_WS_URL;

#[tokio::test]
async fn test_connect_to_feed() {
    let result = connect(FEED_WS_URL).await;
    assert!(result.is_ok(), "Failed to connect to ticker feed");
}

#[tokio::test]
async fn test_subscribe_and_receive_ticker() {
    let (mut write, mut read) = connect(FEED_WS_URL).await.expect("Failed to connect");

    let instruments = vec!["BTC-USD".to_string()];
    subscribe(&mut write, Channel::Ticker, &instruments)
        .await
        .expect("Failed to subscribe to ticker");

    let timeout = tokio::time::timeout(Duration::from_secs(15), async {
        while let Some(msg) = read.next().await {
            if let Ok(tungstenite::Message::Text(text)) = msg {
                if text.contains("\"type\":\"ticker\"") {
                    return true;
                }
            }
        }
        false
    });

    let received_ticker = timeout.await.expect("Timeout waiting for ticker");
    assert!(received_ticker, "Did not receive ticker message");
}

#[tokio::test]
async fn test_engine_publishes_live_snapshot() {
    let config = EngineConfig::new(FEED_WS_URL, vec!["BTC-USD".to_string()]);
    let mut engine = EngineFacade::new(config).expect("Invalid config");
    let mut updates = engine.subscribe();
    engine.start();

    let snapshot = tokio::time::timeout(Duration::from_secs(20), updates.recv())
        .await
        .expect("Timeout waiting for snapshot")
        .expect("Update stream closed");

    assert_eq!(snapshot.instrument, "BTC-USD");
    assert!(snapshot.price > 0.0);
    assert_eq!(engine.connection_state(), ConnectionState::Connected);

    engine.stop().await;
    assert_eq!(engine.connection_state(), ConnectionState::Disconnected);
}
