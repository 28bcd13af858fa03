use chrono::NaiveDate;
use scanner_core::stats::{compounded_decline, meets_threshold, range_ratio};
use scanner_core::{DropEvent, PricePoint, PriceSeries, ScanConfig, SkipReason};
use serde::{Deserialize, Serialize};

use crate::windows::{missing_weekdays, weekly_bucket_returns, ScanWindows};

/// The subset of [`ScanConfig`] the detector needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    pub stable_window_days: usize,
    pub drop_window_days: usize,
    pub min_drop_percent: f64,
    pub max_stable_volatility: f64,
    pub weekly_bucket_days: usize,
    /// Missing Mon-Fri sessions tolerated between observations
    pub max_gap_weekdays: u32,
    pub as_of: Option<NaiveDate>,
}

impl From<&ScanConfig> for DetectorParams {
    fn from(config: &ScanConfig) -> Self {
        Self {
            stable_window_days: config.stable_window_days,
            drop_window_days: config.drop_window_days,
            min_drop_percent: config.min_drop_percent,
            max_stable_volatility: config.max_stable_volatility,
            weekly_bucket_days: config.weekly_bucket_days,
            max_gap_weekdays: config.max_gap_weekdays,
            as_of: config.as_of,
        }
    }
}

/// Result of evaluating one series, including why it did not qualify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DropOutcome {
    Qualified(DropEvent),
    InsufficientHistory { available: usize, required: usize },
    Stale { last_date: NaiveDate, as_of: NaiveDate },
    TradingGap { from: NaiveDate, to: NaiveDate },
    Unstable { range_ratio: f64 },
    ShallowDrop { cumulative_drop_pct: f64 },
}

impl DropOutcome {
    pub fn into_event(self) -> Option<DropEvent> {
        self.into_result().ok()
    }

    /// The event, or the reason the series was skipped
    pub fn into_result(self) -> Result<DropEvent, SkipReason> {
        match self {
            DropOutcome::Qualified(event) => Ok(event),
            DropOutcome::InsufficientHistory { .. } => Err(SkipReason::InsufficientHistory),
            DropOutcome::Stale { .. } => Err(SkipReason::Stale),
            DropOutcome::TradingGap { .. } => Err(SkipReason::TradingGap),
            DropOutcome::Unstable { .. } => Err(SkipReason::Unstable),
            DropOutcome::ShallowDrop { .. } => Err(SkipReason::ShallowDrop),
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            DropOutcome::Qualified(_) => None,
            DropOutcome::InsufficientHistory { .. } => Some(SkipReason::InsufficientHistory),
            DropOutcome::Stale { .. } => Some(SkipReason::Stale),
            DropOutcome::TradingGap { .. } => Some(SkipReason::TradingGap),
            DropOutcome::Unstable { .. } => Some(SkipReason::Unstable),
            DropOutcome::ShallowDrop { .. } => Some(SkipReason::ShallowDrop),
        }
    }

    pub fn is_qualified(&self) -> bool {
        matches!(self, DropOutcome::Qualified(_))
    }

    pub fn label(&self) -> &'static str {
        self.skip_reason().map_or("qualified", |r| r.label())
    }
}

pub struct DropDetector {
    params: DetectorParams,
}

impl DropDetector {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            params: DetectorParams::from(config),
        }
    }

    pub fn with_params(params: DetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// The qualifying drop event, if any
    pub fn detect(&self, series: &PriceSeries) -> Option<DropEvent> {
        self.evaluate(series).into_event()
    }

    pub fn evaluate(&self, series: &PriceSeries) -> DropOutcome {
        let p = &self.params;
        let required = p.stable_window_days + p.drop_window_days;
        let points = self.visible_points(series);

        if let (Some(as_of), Some(last)) = (p.as_of, points.last()) {
            if missing_weekdays(last.date, as_of) > p.max_gap_weekdays {
                tracing::debug!("{}: history ends {} (as of {})", series.ticker(), last.date, as_of);
                return DropOutcome::Stale {
                    last_date: last.date,
                    as_of,
                };
            }
        }

        let windows = match ScanWindows::split(points, p.stable_window_days, p.drop_window_days) {
            Some(w) => w,
            None => {
                return DropOutcome::InsufficientHistory {
                    available: points.len(),
                    required,
                }
            }
        };

        if let Some((from, to)) = windows.find_gap(p.max_gap_weekdays) {
            return DropOutcome::TradingGap { from, to };
        }
        if let Some(day) = windows.find_halt() {
            return DropOutcome::TradingGap { from: day, to: day };
        }

        let stability_ratio = range_ratio(&windows.stability_closes());
        if stability_ratio > p.max_stable_volatility {
            return DropOutcome::Unstable {
                range_ratio: stability_ratio,
            };
        }

        let reference = windows.reference_price();
        let weekly_returns =
            weekly_bucket_returns(reference, &windows.drop_closes(), p.weekly_bucket_days);
        let cumulative_drop_pct = compounded_decline(&weekly_returns);

        if cumulative_drop_pct <= 0.0 || !meets_threshold(cumulative_drop_pct, p.min_drop_percent) {
            return DropOutcome::ShallowDrop {
                cumulative_drop_pct,
            };
        }

        tracing::debug!(
            "{}: {:.1}% compounded drop after stable window (range ratio {:.3})",
            series.ticker(),
            cumulative_drop_pct * 100.0,
            stability_ratio
        );

        DropOutcome::Qualified(DropEvent {
            ticker: series.ticker().to_string(),
            stability_window: windows.stability_range(),
            drop_window: windows.drop_range(),
            cumulative_drop_pct,
            pre_drop_reference_price: reference,
            current_price: windows.current_price(),
            stability_range_ratio: stability_ratio,
            weekly_returns,
        })
    }

    /// Points on or before the scan date
    fn visible_points<'a>(&self, series: &'a PriceSeries) -> &'a [PricePoint] {
        let points = series.points();
        match self.params.as_of {
            Some(as_of) => &points[..points.partition_point(|p| p.date <= as_of)],
            None => points,
        }
    }
}
