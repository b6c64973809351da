//! Serialization tests for subscription requests and the Channel enum.

use tickwise::models::{Channel, SubscribeRequest};
use tickwise::websocket::ticker_subscription;

#[test]
fn test_channel_as_str_returns_wire_name() {
    assert_eq!(Channel::Ticker.as_str(), "ticker");
}

#[test]
fn test_subscribe_request_serializes() {
    let instruments = vec!["BTC-USD".to_string(), "ETH-USD".to_string()];
    let request = SubscribeRequest::new(Channel::Ticker, &instruments);

    let json = serde_json::to_string(&request).expect("Failed to serialize subscribe request");
    let value: serde_json::Value =
        serde_json::from_str(&json).expect("Failed to parse serialized JSON");

    assert_eq!(value["type"], "subscribe");
    assert_eq!(value["channels"][0]["name"], "ticker");
    assert_eq!(value["channels"][0]["product_ids"][0], "BTC-USD");
    assert_eq!(value["channels"][0]["product_ids"][1], "ETH-USD");
    assert_eq!(value["channels"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_ticker_subscription_names_every_instrument() {
    let instruments: Vec<String> = ["BTC-USD", "ETH-USD", "ADA-USD", "SOL-USD"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let json = ticker_subscription(&instruments).expect("Failed to build subscription");
    let value: serde_json::Value =
        serde_json::from_str(&json).expect("Failed to parse serialized JSON");

    assert_eq!(
        value,
        serde_json::json!({
            "type": "subscribe",
            "channels": [{
                "name": "ticker",
                "product_ids": ["BTC-USD", "ETH-USD", "ADA-USD", "SOL-USD"]
            }]
        })
    );
}
