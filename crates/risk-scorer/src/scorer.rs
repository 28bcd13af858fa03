use scanner_core::{BankruptcyRisk, DropEvent, Fundamentals, RiskAssessment, RiskComponents};
use serde::{Deserialize, Serialize};

use crate::scale::PiecewiseScale;

/// Sub-score assigned when a fundamentals field is missing
const WORST_CASE: f64 = 10.0;

/// Weights for the four sub-scores (sum = 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub debt_to_equity: f64,
    pub current_ratio: f64,
    pub drop_severity: f64,
    pub volatility: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            debt_to_equity: 0.30,
            current_ratio: 0.25,
            drop_severity: 0.20,
            volatility: 0.25,
        }
    }
}

/// Raw-metric to sub-score maps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScales {
    pub debt_to_equity: PiecewiseScale,
    /// Decreasing: a weaker current ratio means more risk
    pub current_ratio: PiecewiseScale,
    pub drop_severity: PiecewiseScale,
    pub volatility: PiecewiseScale,
}

impl Default for RiskScales {
    fn default() -> Self {
        Self {
            debt_to_equity: PiecewiseScale::new(vec![
                (0.0, 0.0),
                (0.5, 3.0),
                (1.0, 5.0),
                (2.0, 8.0),
                (3.0, 10.0),
            ]),
            current_ratio: PiecewiseScale::new(vec![
                (0.5, 10.0),
                (1.0, 7.0),
                (1.5, 4.0),
                (2.0, 2.0),
                (3.0, 0.0),
            ]),
            drop_severity: PiecewiseScale::new(vec![
                (0.0, 0.0),
                (0.2, 3.0),
                (0.3, 5.0),
                (0.4, 7.0),
                (0.5, 9.0),
                (0.6, 10.0),
            ]),
            volatility: PiecewiseScale::new(vec![
                (0.0, 0.0),
                (0.2, 2.0),
                (0.3, 4.0),
                (0.4, 6.0),
                (0.6, 10.0),
            ]),
        }
    }
}

/// Weighted bankruptcy-risk model. Never fails on numeric input.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: RiskWeights,
    scales: RiskScales,
}

impl RiskScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: RiskWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_scales(mut self, scales: RiskScales) -> Self {
        self.scales = scales;
        self
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    pub fn score(&self, fundamentals: &Fundamentals, drop: &DropEvent) -> RiskAssessment {
        let components = self.components(fundamentals, drop);
        let w = &self.weights;

        let composite = components.debt_to_equity * w.debt_to_equity
            + components.current_ratio * w.current_ratio
            + components.drop_severity * w.drop_severity
            + components.volatility * w.volatility;
        let risk_score = if composite.is_nan() {
            WORST_CASE
        } else {
            composite.clamp(0.0, 10.0)
        };

        tracing::debug!(
            "{}: risk {:.2} (d/e {:.1}, cr {:.1}, drop {:.1}, vol {:.1})",
            drop.ticker,
            risk_score,
            components.debt_to_equity,
            components.current_ratio,
            components.drop_severity,
            components.volatility
        );

        RiskAssessment {
            ticker: drop.ticker.clone(),
            risk_score,
            bankruptcy_risk: BankruptcyRisk::from_score(risk_score),
            components,
        }
    }

    /// Individual sub-scores; missing or invalid fields score worst case
    pub fn components(&self, fundamentals: &Fundamentals, drop: &DropEvent) -> RiskComponents {
        let f = fundamentals.clone().sanitized();
        let sub = |scale: &PiecewiseScale, value: Option<f64>| {
            value.map(|v| scale.apply(v)).unwrap_or(WORST_CASE)
        };

        RiskComponents {
            debt_to_equity: sub(&self.scales.debt_to_equity, f.debt_to_equity),
            current_ratio: sub(&self.scales.current_ratio, f.current_ratio),
            drop_severity: sub(&self.scales.drop_severity, Some(drop.cumulative_drop_pct)),
            volatility: sub(&self.scales.volatility, f.volatility),
        }
    }
}
