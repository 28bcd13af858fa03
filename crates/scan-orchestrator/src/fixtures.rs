//! Frozen price histories shared by the orchestrator tests

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use scanner_core::{Fundamentals, PricePoint, PriceSeries};

pub fn trading_days(n: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(n);
    let mut d = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    while days.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(d);
        }
        d += Duration::days(1);
    }
    days
}

pub fn series(ticker: &str, closes: &[f64]) -> PriceSeries {
    let points = trading_days(closes.len())
        .into_iter()
        .zip(closes)
        .map(|(d, c)| PricePoint::new(d, *c).with_volume(1_000_000.0))
        .collect();
    PriceSeries::new(ticker, points).unwrap()
}

/// 90 calm days within 100 +/- 2.5 (range ratio 0.05) ending at 100
pub fn calm_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..89)
        .map(|i| match i % 4 {
            0 => 102.5,
            2 => 97.5,
            _ => 100.0,
        })
        .collect();
    closes.push(100.0);
    closes
}

/// Calm window followed by a 21-day slide that compounds to a 30% decline
pub fn fallen_series(ticker: &str) -> PriceSeries {
    let mut closes = calm_closes();
    for end in [92.0, 84.0, 77.0, 72.0] {
        closes.extend(std::iter::repeat(end).take(5));
    }
    closes.push(70.0);
    series(ticker, &closes)
}

/// Calm window followed by a calm drop window
pub fn steady_series(ticker: &str) -> PriceSeries {
    let mut closes = calm_closes();
    closes.extend(std::iter::repeat(100.0).take(21));
    series(ticker, &closes)
}

pub fn fundamentals(ticker: &str, market_cap: f64) -> Fundamentals {
    Fundamentals {
        ticker: ticker.to_string(),
        debt_to_equity: Some(0.4),
        current_ratio: Some(1.8),
        market_cap: Some(market_cap),
        volatility: Some(0.25),
    }
}
