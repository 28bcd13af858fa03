use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Candidate;

/// Why a ticker's price history did not yield a drop event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientHistory,
    /// Last observation is too far behind the evaluation date
    Stale,
    TradingGap,
    Unstable,
    ShallowDrop,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::InsufficientHistory => "insufficient_history",
            SkipReason::Stale => "stale",
            SkipReason::TradingGap => "trading_gap",
            SkipReason::Unstable => "unstable",
            SkipReason::ShallowDrop => "shallow_drop",
        }
    }
}

/// Why tickers were dropped without producing an error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub insufficient_history: usize,
    #[serde(default)]
    pub stale: usize,
    pub trading_gap: usize,
    pub unstable: usize,
    pub shallow_drop: usize,
    pub below_market_cap: usize,
    pub above_risk_ceiling: usize,
    pub over_limit: usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        let slot = match reason {
            SkipReason::InsufficientHistory => &mut self.insufficient_history,
            SkipReason::Stale => &mut self.stale,
            SkipReason::TradingGap => &mut self.trading_gap,
            SkipReason::Unstable => &mut self.unstable,
            SkipReason::ShallowDrop => &mut self.shallow_drop,
        };
        *slot += 1;
    }
}

/// A per-ticker failure recorded for the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerError {
    pub ticker: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub tickers_scanned: usize,
    /// Tickers that produced a drop event
    pub tickers_qualified: usize,
    pub candidates_admitted: usize,
    pub skipped: SkipCounts,
    pub error_count: usize,
    /// Sorted by ticker
    pub errors: Vec<TickerError>,
}

/// Everything a scan hands to its report sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub candidates: Vec<Candidate>,
    pub metadata: ScanMetadata,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn headline(&self) -> String {
        if self.candidates.is_empty() {
            "No Fallen Angels Today".to_string()
        } else {
            format!("{} Fallen Angels Found", self.candidates.len())
        }
    }
}
