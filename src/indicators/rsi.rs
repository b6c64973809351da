/// Standard RSI lookback.
pub const RSI_PERIOD: usize = 14;

/// Value reported when there is not enough history.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Relative Strength Index with Wilder smoothing.
///
/// Needs `period + 1` prices; with fewer it returns [`NEUTRAL_RSI`]. The
/// first `period` deltas seed plain averages of gains and losses, every
/// later delta is folded in with `avg = (avg * (period - 1) + x) / period`.
/// A zero average loss reads as 100. The result is always within
/// `[0, 100]`; a history containing a non-finite price reads as neutral.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return NEUTRAL_RSI;
    }
    if prices.iter().any(|p| !p.is_finite()) {
        return NEUTRAL_RSI;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = deltas.split_at(period);

    let period_f = period as f64;
    let mut avg_gain = seed.iter().map(|d| d.max(0.0)).sum::<f64>() / period_f;
    let mut avg_loss = seed.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period_f;

    for &delta in rest {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }

    let value = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
    if value.is_nan() {
        // Overflowing deltas (inf / inf).
        return NEUTRAL_RSI;
    }
    value.clamp(0.0, 100.0)
}
