//! Engine configuration.
//!
//! The engine itself only takes an [`EngineConfig`] value. The loaders in
//! this module exist for the binary:
//! - [`EngineConfig::load`] reads a TOML file.
//! - [`fetch_config`] layers environment variables on top of an optional
//!   file named by `TICKWISE_CONFIG`:
//!   - `TICKWISE_WEBSOCKET_URL`: feed endpoint
//!   - `TICKWISE_INSTRUMENTS`: comma separated instrument ids

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Result, TickwiseError};

/// Default public ticker feed endpoint.
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://ws-feed.exchange.coinbase.com";

/// Instruments tracked when none are configured.
pub const DEFAULT_INSTRUMENTS: [&str; 6] = [
    "BTC-USD", "ETH-USD", "ADA-USD", "SOL-USD", "DOT-USD", "DOGE-USD",
];

/// Rolling history length per instrument.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Fixed delay before a reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

const DEFAULT_UPDATE_BUFFER: usize = 256;

/// Constructor configuration for [`EngineFacade`](crate::EngineFacade).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    pub websocket_url: String,
    pub instruments: Vec<String>,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Capacity of the snapshot broadcast channel.
    #[serde(default = "default_update_buffer")]
    pub update_buffer: usize,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

fn default_update_buffer() -> usize {
    DEFAULT_UPDATE_BUFFER
}

impl EngineConfig {
    /// Creates a configuration with default capacity and reconnect delay.
    #[must_use]
    pub fn new(websocket_url: impl Into<String>, instruments: Vec<String>) -> Self {
        Self {
            websocket_url: websocket_url.into(),
            instruments,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            update_buffer: DEFAULT_UPDATE_BUFFER,
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`TickwiseError::Toml`] if the document does not deserialize
    /// and [`TickwiseError::Config`] if it fails [`validate`](Self::validate).
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`TickwiseError::Io`] if the file cannot be read, otherwise
    /// the errors of [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks the values the engine cannot run without.
    ///
    /// # Errors
    ///
    /// Returns [`TickwiseError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.websocket_url.is_empty() {
            return Err(TickwiseError::Config("websocket_url is empty".to_string()));
        }
        if self.instruments.is_empty() {
            return Err(TickwiseError::Config(
                "at least one instrument is required".to_string(),
            ));
        }
        if self.instruments.iter().any(|i| i.trim().is_empty()) {
            return Err(TickwiseError::Config(
                "instrument ids must not be blank".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(TickwiseError::Config(
                "history_capacity must be greater than zero".to_string(),
            ));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(TickwiseError::Config(
                "reconnect_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.update_buffer == 0 {
            return Err(TickwiseError::Config(
                "update_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_WEBSOCKET_URL,
            DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

/// Loads the binary's configuration.
///
/// Starts from the file named by `TICKWISE_CONFIG` (or the defaults), then
/// applies `TICKWISE_WEBSOCKET_URL` and `TICKWISE_INSTRUMENTS` overrides.
///
/// # Errors
///
/// Returns a [`TickwiseError`] if the file cannot be loaded or the final
/// configuration fails validation.
pub fn fetch_config() -> Result<EngineConfig> {
    let mut config = match non_empty_var("TICKWISE_CONFIG") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    if let Some(url) = non_empty_var("TICKWISE_WEBSOCKET_URL") {
        config.websocket_url = url;
    }
    if let Some(list) = non_empty_var("TICKWISE_INSTRUMENTS") {
        config.instruments = parse_instrument_list(&list);
    }

    config.validate()?;
    Ok(config)
}

/// Splits a comma separated instrument list, dropping blanks.
fn parse_instrument_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
