use serde::Serialize;

/// Number of recent prices the trend looks at.
pub const TREND_WINDOW: usize = 5;

/// Parabolic SAR acceleration factor, fixed at its starting value.
pub const SAR_ACCELERATION: f64 = 0.02;

/// Half-width of the synthetic high/low band around each price.
const SYNTHETIC_RANGE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    /// Not enough history to call a direction.
    Neutral,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Bullish => "BULLISH",
            TrendDirection::Bearish => "BEARISH",
            TrendDirection::Neutral => "NEUTRAL",
        }
    }
}

/// Trailing stop level and the direction it trails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub value: f64,
    pub direction: TrendDirection,
}

/// Simplified Parabolic SAR.
///
/// No high/low feed exists, so each of the last [`TREND_WINDOW`] prices is
/// widened into a synthetic `price * 1.02` high and `price * 0.98` low. A
/// bullish trend trails below the lowest low, a bearish one above the
/// highest high, both offset by [`SAR_ACCELERATION`].
pub fn trend(prices: &[f64]) -> Trend {
    let last = prices.last().copied().unwrap_or(0.0);
    if prices.len() < TREND_WINDOW {
        return Trend {
            value: last,
            direction: TrendDirection::Neutral,
        };
    }

    let previous = prices[prices.len() - 2];
    let window = &prices[prices.len() - TREND_WINDOW..];

    if last > previous {
        let lowest = window
            .iter()
            .map(|p| p * (1.0 - SYNTHETIC_RANGE))
            .fold(f64::INFINITY, f64::min);
        Trend {
            value: lowest * (1.0 - SAR_ACCELERATION),
            direction: TrendDirection::Bullish,
        }
    } else {
        let highest = window
            .iter()
            .map(|p| p * (1.0 + SYNTHETIC_RANGE))
            .fold(f64::NEG_INFINITY, f64::max);
        Trend {
            value: highest * (1.0 + SAR_ACCELERATION),
            direction: TrendDirection::Bearish,
        }
    }
}
