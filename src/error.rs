//! Crate-level error types.
//!
//! [`TickwiseError`] unifies every error source (configuration, WebSocket,
//! JSON, inbound feed data) behind a single enum. Only configuration
//! loading and connecting surface these to callers; inside the ingestion
//! path they describe why a message was discarded.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TickwiseError>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum TickwiseError {
    /// Configuration could not be read or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML configuration file could not be deserialized.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An inbound message was not valid JSON or lacked required fields.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A ticker event was recognised but its values cannot form a tick.
    #[error("invalid tick for {instrument}: {reason}")]
    InvalidTick { instrument: String, reason: String },
}
