use async_trait::async_trait;

use crate::{Fundamentals, PriceSeries, ScanError, ScanReport};

/// Source of daily close histories
#[async_trait]
pub trait PriceSeriesProvider: Send + Sync {
    async fn price_series(&self, ticker: &str) -> Result<PriceSeries, ScanError>;
}

/// Source of point-in-time fundamentals snapshots
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals, ScanError>;
}

/// Receives the finished scan for rendering or delivery
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, report: &ScanReport) -> Result<(), ScanError>;
    fn name(&self) -> &str;
}
