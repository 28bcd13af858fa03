use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::ScanError;

/// Parameters for one scan. Every core component reads only from this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    // Drop detection
    pub stable_window_days: usize,    // 90
    pub drop_window_days: usize,      // 21
    pub min_drop_percent: f64,        // 0.20 (fraction)
    pub max_stable_volatility: f64,   // 0.10 (range / mean)
    pub weekly_bucket_days: usize,    // 5
    pub max_gap_weekdays: u32,        // 3 missing Mon-Fri sessions
    pub as_of: Option<NaiveDate>,

    // Admission and ranking
    pub min_market_cap: f64,          // $2B
    pub admission_risk_ceiling: f64,  // 7.0
    pub max_candidates: usize,        // 15

    // Orchestration
    pub max_concurrency: usize,       // 8
    pub fetch_timeout_secs: u64,      // 30
    pub derive_missing_volatility: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            stable_window_days: 90,
            drop_window_days: 21,
            min_drop_percent: 0.20,
            max_stable_volatility: 0.10,
            weekly_bucket_days: 5,
            max_gap_weekdays: 3,
            as_of: None,
            min_market_cap: 2e9,
            admission_risk_ceiling: 7.0,
            max_candidates: 15,
            max_concurrency: 8,
            fetch_timeout_secs: 30,
            derive_missing_volatility: true,
        }
    }
}

impl ScanConfig {
    /// Load from environment variables, falling back to defaults. The result is validated.
    pub fn from_env() -> Result<Self, ScanError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Aliases are tried in order.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScanError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let as_of = match first_value(&lookup, &["SCAN_AS_OF"]) {
            Some((key, raw)) => Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                    ScanError::Configuration(format!("{}: invalid date '{}': {}", key, raw, e))
                })?,
            ),
            None => None,
        };

        let config = Self {
            stable_window_days: parse_or(
                &lookup,
                &["STABLE_WINDOW_DAYS", "MIN_STABLE_PERIOD"],
                defaults.stable_window_days,
            )?,
            drop_window_days: parse_or(
                &lookup,
                &["DROP_WINDOW_DAYS", "DROP_LOOKBACK_DAYS"],
                defaults.drop_window_days,
            )?,
            min_drop_percent: parse_or(&lookup, &["MIN_DROP_PERCENT"], defaults.min_drop_percent)?,
            max_stable_volatility: parse_or(
                &lookup,
                &["MAX_STABLE_VOLATILITY"],
                defaults.max_stable_volatility,
            )?,
            weekly_bucket_days: parse_or(&lookup, &["WEEKLY_BUCKET_DAYS"], defaults.weekly_bucket_days)?,
            max_gap_weekdays: parse_or(
                &lookup,
                &["MAX_GAP_WEEKDAYS", "MAX_GAP_DAYS"],
                defaults.max_gap_weekdays,
            )?,
            as_of,
            min_market_cap: parse_or(&lookup, &["MIN_MARKET_CAP"], defaults.min_market_cap)?,
            admission_risk_ceiling: parse_or(
                &lookup,
                &["ADMISSION_RISK_CEILING"],
                defaults.admission_risk_ceiling,
            )?,
            max_candidates: parse_or(&lookup, &["MAX_CANDIDATES"], defaults.max_candidates)?,
            max_concurrency: parse_or(&lookup, &["SCAN_CONCURRENCY"], defaults.max_concurrency)?,
            fetch_timeout_secs: parse_or(&lookup, &["FETCH_TIMEOUT_SECS"], defaults.fetch_timeout_secs)?,
            derive_missing_volatility: parse_or(
                &lookup,
                &["DERIVE_MISSING_VOLATILITY"],
                defaults.derive_missing_volatility,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations that would invalidate every ticker's evaluation.
    pub fn validate(&self) -> Result<(), ScanError> {
        let fail = |msg: String| -> Result<(), ScanError> { Err(ScanError::Configuration(msg)) };

        if self.stable_window_days == 0 {
            return fail("STABLE_WINDOW_DAYS must be > 0".to_string());
        }
        if self.drop_window_days == 0 {
            return fail("DROP_WINDOW_DAYS must be > 0".to_string());
        }
        if self.weekly_bucket_days == 0 {
            return fail("WEEKLY_BUCKET_DAYS must be > 0".to_string());
        }
        if !(self.min_drop_percent > 0.0 && self.min_drop_percent <= 1.0) {
            return fail(format!(
                "MIN_DROP_PERCENT must be a fraction in (0, 1], got {}",
                self.min_drop_percent
            ));
        }
        if !self.max_stable_volatility.is_finite() || self.max_stable_volatility < 0.0 {
            return fail(format!(
                "MAX_STABLE_VOLATILITY must be >= 0, got {}",
                self.max_stable_volatility
            ));
        }
        if !self.min_market_cap.is_finite() || self.min_market_cap < 0.0 {
            return fail(format!("MIN_MARKET_CAP must be >= 0, got {}", self.min_market_cap));
        }
        if !(self.admission_risk_ceiling > 0.0 && self.admission_risk_ceiling <= 10.0) {
            return fail(format!(
                "ADMISSION_RISK_CEILING must be in (0, 10], got {}",
                self.admission_risk_ceiling
            ));
        }
        if self.max_candidates == 0 {
            return fail("MAX_CANDIDATES must be > 0".to_string());
        }
        if self.max_concurrency == 0 {
            return fail("SCAN_CONCURRENCY must be > 0".to_string());
        }
        if self.fetch_timeout_secs == 0 {
            return fail("FETCH_TIMEOUT_SECS must be > 0".to_string());
        }
        Ok(())
    }

    /// Trading days a series must cover to be evaluated
    pub fn required_history(&self) -> usize {
        self.stable_window_days + self.drop_window_days
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn first_value<F>(lookup: &F, keys: &[&'static str]) -> Option<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .find_map(|key| lookup(*key).filter(|v| !v.trim().is_empty()).map(|v| (*key, v)))
}

fn parse_or<T, F>(lookup: &F, keys: &[&'static str], default: T) -> Result<T, ScanError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match first_value(lookup, keys) {
        Some((key, raw)) => {
            tracing::debug!("config {} = {}", key, raw.trim());
            raw.trim().parse().map_err(|e| {
                ScanError::Configuration(format!("{}: invalid value '{}': {}", key, raw, e))
            })
        }
        None => Ok(default),
    }
}
