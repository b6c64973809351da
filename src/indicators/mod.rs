//! Pure technical indicators over a price history.
//!
//! Every function takes the history oldest-first and recomputes from
//! scratch; nothing is carried between calls, so the same history always
//! yields the same [`IndicatorSnapshot`]. Short histories produce neutral
//! defaults rather than errors.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod trend;

use serde::Serialize;

pub use macd::{Macd, macd};
pub use rsi::{RSI_PERIOD, rsi};
pub use trend::{Trend, TrendDirection, trend};

/// All indicators for one history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: Macd,
    pub trend: Trend,
}

impl IndicatorSnapshot {
    pub fn compute(prices: &[f64]) -> Self {
        Self {
            rsi: rsi(prices, RSI_PERIOD),
            macd: macd(prices),
            trend: trend(prices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BITCOIN_SAMPLE: [f64; 14] = [
        40000.0, 41200.0, 42100.0, 41800.0, 42500.0, 43100.0, 42900.0, 43250.0, 43400.0, 43100.0,
        43300.0, 43250.0, 43500.0, 43200.0,
    ];

    #[test]
    fn bitcoin_sample_snapshot() {
        let snapshot = IndicatorSnapshot::compute(&BITCOIN_SAMPLE);
        assert_eq!(snapshot.rsi, 50.0);
        assert_eq!(snapshot.macd, Macd::default());
        assert_eq!(snapshot.trend.direction, TrendDirection::Bearish);
        let expected = 43500.0 * 1.02 * 1.02;
        assert!((snapshot.trend.value - expected).abs() < 1e-6);
    }

    #[test]
    fn empty_history_is_neutral() {
        let snapshot = IndicatorSnapshot::compute(&[]);
        assert_eq!(snapshot.rsi, 50.0);
        assert_eq!(snapshot.macd, Macd::default());
        assert_eq!(snapshot.trend.direction, TrendDirection::Neutral);
    }

    #[test]
    fn recomputation_is_deterministic() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64).cos() * 3.0).collect();
        assert_eq!(
            IndicatorSnapshot::compute(&prices),
            IndicatorSnapshot::compute(&prices)
        );
    }
}
