/// Exponential moving average over the whole input.
///
/// Seeded with the first value (`ema[0] = values[0]`), then
/// `ema[i] = (values[i] - ema[i-1]) * k + ema[i-1]` with `k = 2 / (period + 1)`.
/// The output has the same length as the input; a zero period yields an
/// empty vector.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    if period == 0 {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    result.push(first);

    let mut prev = first;
    for &value in &values[1..] {
        prev = (value - prev) * k + prev;
        result.push(prev);
    }

    result
}

/// Final value of [`ema_series`], or `None` for empty input.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied()
}
