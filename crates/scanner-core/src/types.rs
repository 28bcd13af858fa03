use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Market, ScanError};

/// Daily close for one trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// Ordered daily price history for a single ticker.
///
/// Only constructible through [`PriceSeries::new`], so every instance has strictly
/// increasing dates and positive finite closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, ScanError> {
        let ticker = ticker.into();

        for (i, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(ScanError::malformed(
                    &ticker,
                    format!("close {} on {} is not a positive number", point.close, point.date),
                ));
            }
            if let Some(volume) = point.volume {
                if !volume.is_finite() || volume < 0.0 {
                    return Err(ScanError::malformed(
                        &ticker,
                        format!("volume {} on {} is invalid", volume, point.date),
                    ));
                }
            }
            if i > 0 && points[i - 1].date >= point.date {
                return Err(ScanError::malformed(
                    &ticker,
                    format!(
                        "dates not strictly increasing ({} followed by {})",
                        points[i - 1].date, point.date
                    ),
                ));
            }
        }

        Ok(Self { ticker, points })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

/// Point-in-time fundamentals snapshot. `None` means the provider had no value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub ticker: String,
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
    #[serde(default)]
    pub current_ratio: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    /// Annualized volatility as a fraction (0.25 = 25%)
    #[serde(default)]
    pub volatility: Option<f64>,
}

impl Fundamentals {
    /// Snapshot with every field missing
    pub fn missing(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    /// Negative or non-finite values become `None`.
    pub fn sanitized(self) -> Self {
        fn clean(value: Option<f64>) -> Option<f64> {
            value.filter(|v| v.is_finite() && *v >= 0.0)
        }

        Self {
            ticker: self.ticker,
            debt_to_equity: clean(self.debt_to_equity),
            current_ratio: clean(self.current_ratio),
            market_cap: clean(self.market_cap),
            volatility: clean(self.volatility),
        }
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A qualifying decline that followed a calm stability window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEvent {
    pub ticker: String,
    pub stability_window: DateRange,
    pub drop_window: DateRange,
    /// Compounded decline across the drop window, in (0, 1]
    pub cumulative_drop_pct: f64,
    /// Last close of the stability window
    pub pre_drop_reference_price: f64,
    /// Last close of the drop window
    pub current_price: f64,
    pub stability_range_ratio: f64,
    pub weekly_returns: Vec<f64>,
}

/// Categorical bankruptcy risk, ordered from safest to riskiest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BankruptcyRisk {
    VeryLow,
    Low,
    Medium,
    High,
}

impl BankruptcyRisk {
    /// Ordered band table: (lower bound inclusive, label). The last band is closed at 10.
    pub const BANDS: [(f64, BankruptcyRisk); 4] = [
        (0.0, BankruptcyRisk::VeryLow),
        (3.0, BankruptcyRisk::Low),
        (5.0, BankruptcyRisk::Medium),
        (7.0, BankruptcyRisk::High),
    ];

    pub fn from_score(score: f64) -> Self {
        Self::BANDS
            .iter()
            .rev()
            .find(|(lower, _)| score >= *lower)
            .map(|(_, risk)| *risk)
            .unwrap_or(BankruptcyRisk::VeryLow)
    }

    pub fn label(&self) -> &'static str {
        match self {
            BankruptcyRisk::VeryLow => "Very Low",
            BankruptcyRisk::Low => "Low",
            BankruptcyRisk::Medium => "Medium",
            BankruptcyRisk::High => "High",
        }
    }
}

/// The four weighted sub-scores behind a risk score, each in [0, 10]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    pub debt_to_equity: f64,
    pub current_ratio: f64,
    pub drop_severity: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub ticker: String,
    pub risk_score: f64, // 0.0 to 10.0
    pub bankruptcy_risk: BankruptcyRisk,
    pub components: RiskComponents,
}

/// An admitted fallen angel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub ticker: String,
    pub market: Market,
    pub drop: DropEvent,
    pub risk: RiskAssessment,
    /// Appreciation needed to retrace to the pre-drop reference price
    pub potential_gain_pct: f64,
    pub market_cap: f64,
}
