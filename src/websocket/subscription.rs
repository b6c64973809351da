//! Channel subscription requests.

use futures_util::SinkExt;
use tracing::{debug, info};
use tungstenite::Message;

use super::WsWriter;
use crate::Result;
use crate::models::{Channel, SubscribeRequest};

/// Serializes the ticker subscription for `instruments`.
///
/// # Errors
///
/// Returns a [`TickwiseError`](crate::TickwiseError) if serialization fails.
pub fn ticker_subscription(instruments: &[String]) -> Result<String> {
    let request = SubscribeRequest::new(Channel::Ticker, instruments);
    Ok(serde_json::to_string(&request)?)
}

/// Subscribes to a channel for the given instruments on an open writer.
///
/// # Errors
///
/// Returns a [`TickwiseError`](crate::TickwiseError) if sending the subscription message fails.
pub async fn subscribe(write: &mut WsWriter, channel: Channel, instruments: &[String]) -> Result<()> {
    let request = SubscribeRequest::new(channel, instruments);
    let json = serde_json::to_string(&request)?;
    debug!("Sending subscribe request: {}", json);
    write.send(Message::Text(json.into())).await?;
    info!(
        channel = channel.as_str(),
        ?instruments,
        "Subscribed to channel"
    );

    Ok(())
}
