//! Small statistics helpers shared by the detector, scorer and orchestrator.
//!
//! All functions are total: empty or degenerate input returns 0.0 rather than NaN so
//! callers never have to special-case a flat price window.

/// Trading days per year used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Compute sample standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// `(max - min) / mean` of a price window. 0.0 for a flat or empty window.
pub fn range_ratio(closes: &[f64]) -> f64 {
    let m = mean(closes);
    if closes.is_empty() || m <= 0.0 {
        return 0.0;
    }
    let max = closes.iter().cloned().fold(f64::MIN, f64::max);
    let min = closes.iter().cloned().fold(f64::MAX, f64::min);
    (max - min) / m
}

/// Simple close-to-close returns
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Annualized standard deviation of daily returns
pub fn annualized_volatility(closes: &[f64]) -> f64 {
    std_dev(&daily_returns(closes)) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// `1 - PRODUCT(1 + r)`: the compounded decline implied by a run of simple returns.
/// Positive for a net decline, negative for a net gain.
pub fn compounded_decline(returns: &[f64]) -> f64 {
    1.0 - returns.iter().fold(1.0, |acc, r| acc * (1.0 + r))
}

/// Slack allowed when a compounded ratio is compared against a configured threshold
pub const RATIO_TOLERANCE: f64 = 1e-9;

/// `value >= threshold`, ignoring the rounding left behind by compounding.
/// A 100 -> 80 slide compounds to 0.19999999999999996 and still meets a 0.20 floor.
pub fn meets_threshold(value: f64, threshold: f64) -> bool {
    value + RATIO_TOLERANCE >= threshold
}
