use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::{Result, TickwiseError};

/// Inbound `ticker` event as sent by the feed.
///
/// Numeric fields arrive as JSON strings (`"43100.12"`) on the live feed;
/// both strings and numbers are accepted, anything else reads as absent.
#[derive(Debug, Deserialize)]
pub struct TickerMessage {
    #[serde(rename = "type")]
    pub tpe: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub best_bid: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub best_ask: Option<f64>,
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl TickerMessage {
    /// Validates the message into a [`PriceTick`] stamped with `received_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TickwiseError::MalformedMessage`] when `product_id` is
    /// missing and [`TickwiseError::InvalidTick`] when the price is not a
    /// finite positive number.
    pub fn into_tick(self, received_at: DateTime<Utc>) -> Result<PriceTick> {
        let instrument = self
            .product_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TickwiseError::MalformedMessage("ticker without product_id".into()))?;

        let price = self.price.ok_or_else(|| TickwiseError::InvalidTick {
            instrument: instrument.clone(),
            reason: "missing price".to_string(),
        })?;

        let tick = PriceTick::new(instrument, price, received_at)?;
        Ok(tick
            .with_volume_24h(self.volume_24h.unwrap_or(0.0))
            .with_open_24h(self.open_24h)
            .with_quote(self.best_bid, self.best_ask))
    }
}

/// One validated price update for an instrument.
///
/// Fields are only reachable through accessors so a tick cannot change
/// after it has been accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    instrument: String,
    price: f64,
    volume_24h: f64,
    open_24h: Option<f64>,
    best_bid: Option<f64>,
    best_ask: Option<f64>,
    received_at: DateTime<Utc>,
}

impl PriceTick {
    /// Creates a tick carrying only a price.
    ///
    /// # Errors
    ///
    /// Returns [`TickwiseError::InvalidTick`] if `price` is not finite and
    /// strictly positive.
    pub fn new(
        instrument: impl Into<String>,
        price: f64,
        received_at: DateTime<Utc>,
    ) -> Result<Self> {
        let instrument = instrument.into();
        if !price.is_finite() || price <= 0.0 {
            return Err(TickwiseError::InvalidTick {
                instrument,
                reason: format!("price {price} is not a finite positive number"),
            });
        }

        Ok(Self {
            instrument,
            price,
            volume_24h: 0.0,
            open_24h: None,
            best_bid: None,
            best_ask: None,
            received_at,
        })
    }

    /// Sets the rolling 24h volume; negative or non-finite values become 0.
    #[must_use]
    pub fn with_volume_24h(mut self, volume: f64) -> Self {
        self.volume_24h = if volume.is_finite() { volume.max(0.0) } else { 0.0 };
        self
    }

    #[must_use]
    pub fn with_open_24h(mut self, open: Option<f64>) -> Self {
        self.open_24h = open.filter(|v| v.is_finite());
        self
    }

    #[must_use]
    pub fn with_quote(mut self, best_bid: Option<f64>, best_ask: Option<f64>) -> Self {
        self.best_bid = best_bid.filter(|v| v.is_finite() && *v > 0.0);
        self.best_ask = best_ask.filter(|v| v.is_finite() && *v > 0.0);
        self
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn volume_24h(&self) -> f64 {
        self.volume_24h
    }

    pub fn open_24h(&self) -> Option<f64> {
        self.open_24h
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Best bid, falling back to the last price.
    pub fn bid(&self) -> f64 {
        self.best_bid.unwrap_or(self.price)
    }

    /// Best ask, falling back to the last price.
    pub fn ask(&self) -> f64 {
        self.best_ask.unwrap_or(self.price)
    }

    /// Percentage change against the 24h open, 0 without a usable open.
    pub fn change_24h(&self) -> f64 {
        match self.open_24h {
            Some(open) if open > 0.0 => (self.price - open) / open * 100.0,
            _ => 0.0,
        }
    }

    /// Bid/ask spread as a percentage of the bid.
    pub fn spread_pct(&self) -> f64 {
        let bid = self.bid();
        if bid <= 0.0 {
            return 0.0;
        }
        (self.ask() - bid) / bid * 100.0
    }
}
