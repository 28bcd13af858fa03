use risk_scorer::RiskScorer;
use scanner_core::stats::meets_threshold;
use scanner_core::{Candidate, DropEvent, Fundamentals, Market, ScanConfig};
use std::cmp::Ordering;

/// Admission and truncation settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankerParams {
    pub min_drop_percent: f64,
    pub min_market_cap: f64,
    pub admission_risk_ceiling: f64,
    pub max_candidates: usize,
}

impl From<&ScanConfig> for RankerParams {
    fn from(config: &ScanConfig) -> Self {
        Self {
            min_drop_percent: config.min_drop_percent,
            min_market_cap: config.min_market_cap,
            admission_risk_ceiling: config.admission_risk_ceiling,
            max_candidates: config.max_candidates,
        }
    }
}

/// Ranked shortlist plus how many inputs each filter removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankOutcome {
    pub candidates: Vec<Candidate>,
    pub shallow_drop: usize,
    pub below_market_cap: usize,
    pub above_risk_ceiling: usize,
    pub over_limit: usize,
}

/// Pure filter-and-rank stage. Performs no I/O.
pub struct CandidateRanker {
    params: RankerParams,
    scorer: RiskScorer,
}

impl CandidateRanker {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            params: RankerParams::from(config),
            scorer: RiskScorer::new(),
        }
    }

    pub fn with_scorer(mut self, scorer: RiskScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn params(&self) -> &RankerParams {
        &self.params
    }

    pub fn rank(&self, events: Vec<(Fundamentals, DropEvent)>) -> Vec<Candidate> {
        self.rank_with_stats(events).candidates
    }

    pub fn rank_with_stats(&self, events: Vec<(Fundamentals, DropEvent)>) -> RankOutcome {
        let p = &self.params;
        let mut outcome = RankOutcome::default();

        for (fundamentals, drop) in events {
            let risk = self.scorer.score(&fundamentals, &drop);

            if !meets_threshold(drop.cumulative_drop_pct, p.min_drop_percent) {
                outcome.shallow_drop += 1;
                continue;
            }

            let market_cap = match fundamentals.market_cap {
                Some(cap) if cap.is_finite() && cap >= p.min_market_cap => cap,
                _ => {
                    tracing::debug!("{}: below market cap floor", drop.ticker);
                    outcome.below_market_cap += 1;
                    continue;
                }
            };

            if risk.risk_score >= p.admission_risk_ceiling {
                tracing::debug!(
                    "{}: risk {:.2} at or above ceiling {:.2}",
                    drop.ticker,
                    risk.risk_score,
                    p.admission_risk_ceiling
                );
                outcome.above_risk_ceiling += 1;
                continue;
            }

            outcome.candidates.push(Candidate {
                ticker: drop.ticker.clone(),
                market: Market::from_ticker(&drop.ticker),
                potential_gain_pct: potential_gain(&drop),
                market_cap,
                drop,
                risk,
            });
        }

        outcome.candidates.sort_by(compare_candidates);

        if outcome.candidates.len() > p.max_candidates {
            outcome.over_limit = outcome.candidates.len() - p.max_candidates;
            outcome.candidates.truncate(p.max_candidates);
        }

        outcome
    }
}

/// Appreciation needed to retrace from the current price to the pre-drop reference
pub fn potential_gain(drop: &DropEvent) -> f64 {
    if drop.current_price <= 0.0 {
        return 0.0;
    }
    drop.pre_drop_reference_price / drop.current_price - 1.0
}

/// Ascending risk, then descending potential gain, then ticker
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.risk
        .risk_score
        .total_cmp(&b.risk.risk_score)
        .then_with(|| b.potential_gain_pct.total_cmp(&a.potential_gain_pct))
        .then_with(|| a.ticker.cmp(&b.ticker))
}
