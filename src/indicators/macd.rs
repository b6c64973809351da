use serde::Serialize;

use super::ema::ema_series;

pub const MACD_FAST_PERIOD: usize = 12;
pub const MACD_SLOW_PERIOD: usize = 26;
pub const MACD_SIGNAL_PERIOD: usize = 9;

/// MACD line, its signal line, and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Moving Average Convergence Divergence.
///
/// With fewer than 26 prices every component is 0. Otherwise the MACD
/// line is `ema12[i] - ema26[i]` for every index from 25 on, and the
/// signal is the 9-period EMA of that rolling line. A history of exactly
/// 26 prices has a one-element line, so its signal equals the MACD value.
pub fn macd(prices: &[f64]) -> Macd {
    if prices.len() < MACD_SLOW_PERIOD {
        return Macd::default();
    }

    let fast = ema_series(prices, MACD_FAST_PERIOD);
    let slow = ema_series(prices, MACD_SLOW_PERIOD);
    let line: Vec<f64> = fast
        .iter()
        .zip(&slow)
        .skip(MACD_SLOW_PERIOD - 1)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema_series(&line, MACD_SIGNAL_PERIOD);
    match (line.last(), signal_line.last()) {
        (Some(&macd), Some(&signal)) => Macd {
            macd,
            signal,
            histogram: macd - signal,
        },
        _ => Macd::default(),
    }
}
