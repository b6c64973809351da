//! Inbound feed message parsing.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::connection::ConnectionEvent;
use crate::models::{Channel, FeedErrorMessage, PriceTick, TickerMessage};
use crate::{Result, TickwiseError};

/// What an inbound text frame turned out to be.
#[derive(Debug)]
pub enum Inbound {
    Tick(PriceTick),
    /// The feed reported an error (e.g. a rejected subscription).
    FeedError(FeedErrorMessage),
    /// A well-formed message of another type, carrying that type.
    Ignored(String),
}

/// Parses one text frame.
///
/// # Errors
///
/// Returns [`TickwiseError::MalformedMessage`] for invalid JSON, a missing
/// `type`, or a ticker that does not deserialize, and
/// [`TickwiseError::InvalidTick`] for a ticker whose price is not a finite
/// positive number.
pub fn parse_message(text: &str, received_at: DateTime<Utc>) -> Result<Inbound> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| TickwiseError::MalformedMessage(e.to_string()))?;

    let msg_type = value
        .get("type")
        .and_then(|t| t.as_str())
        .map(String::from)
        .ok_or_else(|| TickwiseError::MalformedMessage("message without type".to_string()))?;

    match msg_type.as_str() {
        t if t == Channel::Ticker.as_str() => {
            let message: TickerMessage = serde_json::from_value(value)
                .map_err(|e| TickwiseError::MalformedMessage(e.to_string()))?;
            Ok(Inbound::Tick(message.into_tick(received_at)?))
        }
        "error" => {
            let error: FeedErrorMessage = serde_json::from_value(value)?;
            Ok(Inbound::FeedError(error))
        }
        _ => Ok(Inbound::Ignored(msg_type)),
    }
}

/// Parses a text frame and forwards any tick as a
/// [`ConnectionEvent::TickReceived`]. Everything else is logged and
/// dropped.
///
/// Returns `false` once the event receiver is gone.
pub(crate) fn forward_text(text: &str, events: &mpsc::UnboundedSender<ConnectionEvent>) -> bool {
    match parse_message(text, Utc::now()) {
        Ok(Inbound::Tick(tick)) => events.send(ConnectionEvent::TickReceived(tick)).is_ok(),
        Ok(Inbound::FeedError(error)) => {
            warn!(feed_message = %error.message, reason = ?error.reason, "Feed reported an error");
            true
        }
        Ok(Inbound::Ignored(msg_type)) => {
            debug!(msg_type = %msg_type, "Ignoring non-ticker message");
            true
        }
        Err(e) => {
            warn!("Discarding message: {e}");
            true
        }
    }
}
