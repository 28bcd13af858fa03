use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("Insufficient history for {0}")]
    InsufficientHistory(String),

    #[error("Missing fundamentals for {0}")]
    MissingFundamentals(String),

    #[error("Malformed series for {ticker}: {reason}")]
    MalformedSeries { ticker: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error for {ticker}: {reason}")]
    Provider { ticker: String, reason: String },

    #[error("Fetch for {ticker} timed out after {after:?}")]
    Timeout { ticker: String, after: Duration },

    #[error("Report error: {0}")]
    Report(String),
}

impl ScanError {
    /// Short machine-friendly kind, used in scan metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::InsufficientHistory(_) => "insufficient_history",
            ScanError::MissingFundamentals(_) => "missing_fundamentals",
            ScanError::MalformedSeries { .. } => "malformed_series",
            ScanError::Configuration(_) => "configuration",
            ScanError::Provider { .. } => "provider",
            ScanError::Timeout { .. } => "timeout",
            ScanError::Report(_) => "report",
        }
    }

    pub fn malformed(ticker: &str, reason: impl Into<String>) -> Self {
        ScanError::MalformedSeries {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn provider(ticker: &str, reason: impl Into<String>) -> Self {
        ScanError::Provider {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }
}
