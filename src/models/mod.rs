//! Wire models for the ticker feed.
//!
//! Contains the channel definitions, the subscription request sent once
//! per connection, and the inbound ticker message with the [`PriceTick`]
//! it is validated into.

pub mod ticker;

use serde::{Deserialize, Serialize};

pub use ticker::{PriceTick, TickerMessage};

/// Feed channels this crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Ticker,
}

impl Channel {
    /// Returns the wire-format channel name expected by the feed.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Ticker => "ticker",
        }
    }
}

/// A `subscribe` request naming every tracked instrument.
#[derive(Debug, Serialize)]
pub struct SubscribeRequest {
    #[serde(rename = "type")]
    pub tpe: String,
    pub channels: Vec<ChannelSubscription>,
}

/// One channel entry of a [`SubscribeRequest`].
#[derive(Debug, Serialize)]
pub struct ChannelSubscription {
    pub name: String,
    pub product_ids: Vec<String>,
}

impl SubscribeRequest {
    #[must_use]
    pub fn new(channel: Channel, instruments: &[String]) -> Self {
        Self {
            tpe: "subscribe".to_string(),
            channels: vec![ChannelSubscription {
                name: channel.as_str().to_string(),
                product_ids: instruments.to_vec(),
            }],
        }
    }
}

/// Error notice pushed by the feed, e.g. after a rejected subscription.
#[derive(Debug, Deserialize)]
pub struct FeedErrorMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
}
