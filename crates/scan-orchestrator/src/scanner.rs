use candidate_ranker::CandidateRanker;
use chrono::Utc;
use drop_detector::DropDetector;
use scanner_core::stats::annualized_volatility;
use scanner_core::{
    DropEvent, Fundamentals, FundamentalsProvider, PriceSeries, PriceSeriesProvider, ScanConfig,
    ScanError, ScanMetadata, ScanReport, SkipCounts, SkipReason, TickerError,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// What happened to one ticker during a scan
#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    /// A qualifying drop, paired with the fundamentals used to score it
    Qualified {
        fundamentals: Fundamentals,
        drop: DropEvent,
    },
    /// Evaluated cleanly but did not qualify
    Skipped {
        ticker: String,
        reason: SkipReason,
    },
    Failed {
        ticker: String,
        error: ScanError,
    },
}

impl TickerOutcome {
    pub fn ticker(&self) -> &str {
        match self {
            TickerOutcome::Qualified { drop, .. } => &drop.ticker,
            TickerOutcome::Skipped { ticker, .. } => ticker,
            TickerOutcome::Failed { ticker, .. } => ticker,
        }
    }
}

/// Runs the detect, score and rank pipeline over a ticker universe.
///
/// Each ticker is evaluated in its own task; at most `max_concurrency` fetch at once.
/// Per-ticker failures are recorded in the report and never abort the batch.
pub struct FallenAngelScanner {
    config: ScanConfig,
    prices: Arc<dyn PriceSeriesProvider>,
    fundamentals: Arc<dyn FundamentalsProvider>,
    detector: Arc<DropDetector>,
    ranker: CandidateRanker,
}

impl FallenAngelScanner {
    /// Fails with [`ScanError::Configuration`] before any ticker is touched.
    pub fn new(
        config: ScanConfig,
        prices: Arc<dyn PriceSeriesProvider>,
        fundamentals: Arc<dyn FundamentalsProvider>,
    ) -> Result<Self, ScanError> {
        config.validate()?;

        Ok(Self {
            detector: Arc::new(DropDetector::new(&config)),
            ranker: CandidateRanker::new(&config),
            config,
            prices,
            fundamentals,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub async fn scan(&self, tickers: &[String]) -> Result<ScanReport, ScanError> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let mut seen = HashSet::new();
        let universe: Vec<String> = tickers
            .iter()
            .filter(|t| seen.insert(*t))
            .cloned()
            .collect();

        tracing::info!(
            "Starting fallen angel scan of {} tickers (concurrency {})",
            universe.len(),
            self.config.max_concurrency
        );

        let outcomes = self.evaluate_all(&universe).await;

        let mut skipped = SkipCounts::default();
        let mut errors = Vec::new();
        let mut qualified = Vec::new();

        for outcome in outcomes {
            match outcome {
                TickerOutcome::Qualified { fundamentals, drop } => {
                    qualified.push((fundamentals, drop));
                }
                TickerOutcome::Skipped { reason, .. } => skipped.record(reason),
                TickerOutcome::Failed { ticker, error } => errors.push(TickerError {
                    ticker,
                    kind: error.kind().to_string(),
                    message: error.to_string(),
                }),
            }
        }

        errors.sort_by(|a, b| a.ticker.cmp(&b.ticker).then_with(|| a.kind.cmp(&b.kind)));

        let tickers_qualified = qualified.len();
        let ranked = self.ranker.rank_with_stats(qualified);
        skipped.shallow_drop += ranked.shallow_drop;
        skipped.below_market_cap = ranked.below_market_cap;
        skipped.above_risk_ceiling = ranked.above_risk_ceiling;
        skipped.over_limit = ranked.over_limit;

        let metadata = ScanMetadata {
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            tickers_scanned: universe.len(),
            tickers_qualified,
            candidates_admitted: ranked.candidates.len(),
            skipped,
            error_count: errors.len(),
            errors,
        };

        tracing::info!(
            "Scan complete: {}/{} tickers dropped, {} admitted, {} errors in {}ms",
            metadata.tickers_qualified,
            metadata.tickers_scanned,
            metadata.candidates_admitted,
            metadata.error_count,
            metadata.elapsed_ms
        );

        Ok(ScanReport {
            candidates: ranked.candidates,
            metadata,
        })
    }

    async fn evaluate_all(&self, universe: &[String]) -> Vec<TickerOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(universe.len());

        for name in universe {
            let ticker = name.clone();
            let task = TickerTask {
                prices: Arc::clone(&self.prices),
                fundamentals: Arc::clone(&self.fundamentals),
                detector: Arc::clone(&self.detector),
                timeout: self.config.fetch_timeout(),
                derive_volatility: self.config.derive_missing_volatility,
            };
            let semaphore = Arc::clone(&semaphore);

            let handle = tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return TickerOutcome::Failed {
                            error: ScanError::provider(&ticker, "scan aborted"),
                            ticker,
                        }
                    }
                };
                task.run(ticker).await
            });
            names.insert(handle.id(), name.clone());
        }

        let mut outcomes = Vec::with_capacity(universe.len());
        while let Some(result) = tasks.join_next_with_id().await {
            match result {
                Ok((_, outcome)) => outcomes.push(outcome),
                Err(e) => {
                    let ticker = names
                        .remove(&e.id())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    tracing::error!("Task for {} failed: {}", ticker, e);
                    outcomes.push(TickerOutcome::Failed {
                        error: ScanError::provider(&ticker, format!("task failed: {}", e)),
                        ticker,
                    });
                }
            }
        }
        outcomes
    }
}

/// Everything one ticker's evaluation needs, owned so it can move into a task
struct TickerTask {
    prices: Arc<dyn PriceSeriesProvider>,
    fundamentals: Arc<dyn FundamentalsProvider>,
    detector: Arc<DropDetector>,
    timeout: Duration,
    derive_volatility: bool,
}

impl TickerTask {
    async fn run(self, ticker: String) -> TickerOutcome {
        match self.evaluate(&ticker).await {
            Ok(outcome) => {
                tracing::debug!("{}: {}", ticker, outcome_label(&outcome));
                outcome
            }
            Err(ScanError::InsufficientHistory(_)) => {
                tracing::debug!("{}: provider has insufficient history", ticker);
                TickerOutcome::Skipped {
                    ticker,
                    reason: SkipReason::InsufficientHistory,
                }
            }
            Err(error) => {
                tracing::warn!("Failed to scan {}: {}", ticker, error);
                TickerOutcome::Failed { ticker, error }
            }
        }
    }

    async fn evaluate(&self, ticker: &str) -> Result<TickerOutcome, ScanError> {
        let series = self.fetch_series(ticker).await?;

        let drop = match self.detector.evaluate(&series).into_result() {
            Ok(event) => event,
            Err(reason) => {
                return Ok(TickerOutcome::Skipped {
                    ticker: ticker.to_string(),
                    reason,
                })
            }
        };

        let mut fundamentals = self.fetch_fundamentals(ticker).await?;
        if fundamentals.volatility.is_none() && self.derive_volatility {
            fundamentals.volatility = stability_volatility(&series, &drop);
        }

        Ok(TickerOutcome::Qualified { fundamentals, drop })
    }

    async fn fetch_series(&self, ticker: &str) -> Result<PriceSeries, ScanError> {
        tokio::time::timeout(self.timeout, self.prices.price_series(ticker))
            .await
            .map_err(|_| ScanError::Timeout {
                ticker: ticker.to_string(),
                after: self.timeout,
            })?
    }

    /// Missing fundamentals fall back to an empty snapshot, which scores worst case.
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals, ScanError> {
        let fetched = tokio::time::timeout(self.timeout, self.fundamentals.fundamentals(ticker))
            .await
            .map_err(|_| ScanError::Timeout {
                ticker: ticker.to_string(),
                after: self.timeout,
            })?;

        match fetched {
            Ok(mut f) => {
                f.ticker = ticker.to_string();
                Ok(f)
            }
            Err(ScanError::MissingFundamentals(_)) => {
                tracing::debug!("{}: no fundamentals, scoring worst case", ticker);
                Ok(Fundamentals::missing(ticker))
            }
            Err(e) => Err(e),
        }
    }
}

fn outcome_label(outcome: &TickerOutcome) -> &'static str {
    match outcome {
        TickerOutcome::Qualified { .. } => "qualified",
        TickerOutcome::Skipped { reason, .. } => reason.label(),
        TickerOutcome::Failed { .. } => "failed",
    }
}

/// Annualized volatility of the closes inside the event's stability window
fn stability_volatility(series: &PriceSeries, drop: &DropEvent) -> Option<f64> {
    let window = &drop.stability_window;
    let closes: Vec<f64> = series
        .points()
        .iter()
        .filter(|p| p.date >= window.start && p.date <= window.end)
        .map(|p| p.close)
        .collect();

    if closes.len() < 2 {
        return None;
    }
    let vol = annualized_volatility(&closes);
    vol.is_finite().then_some(vol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fallen_series, fundamentals, series, steady_series};
    use crate::providers::FundamentalsRecord;
    use crate::{InMemoryProvider, JsonDirectoryProvider, TickerFile};
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use scanner_core::BankruptcyRisk;

    fn scenario_config() -> ScanConfig {
        ScanConfig {
            min_market_cap: 5e9,
            ..ScanConfig::default()
        }
    }

    fn scanner_over(provider: InMemoryProvider, config: ScanConfig) -> FallenAngelScanner {
        let provider = Arc::new(provider);
        FallenAngelScanner::new(config, provider.clone(), provider).unwrap()
    }

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_scenario_admits_x_and_excludes_y() {
        let provider = InMemoryProvider::new();
        provider.insert_series(fallen_series("X"));
        provider.insert_fundamentals(fundamentals("X", 10e9));
        provider.insert_series(fallen_series("Y"));
        provider.insert_fundamentals(fundamentals("Y", 1e9));

        let report = scanner_over(provider, scenario_config())
            .scan(&tickers(&["X", "Y"]))
            .await
            .unwrap();

        assert_eq!(report.candidates.len(), 1);
        let x = &report.candidates[0];
        assert_eq!(x.ticker, "X");
        assert_relative_eq!(x.drop.cumulative_drop_pct, 0.30, epsilon = 1e-9);
        assert_relative_eq!(x.risk.risk_score, 3.17, epsilon = 1e-9);
        assert_eq!(x.risk.bankruptcy_risk, BankruptcyRisk::Low);
        assert_relative_eq!(x.potential_gain_pct, 0.4286, epsilon = 1e-4);

        let meta = &report.metadata;
        assert_eq!(meta.tickers_scanned, 2);
        assert_eq!(meta.tickers_qualified, 2);
        assert_eq!(meta.candidates_admitted, 1);
        assert_eq!(meta.skipped.below_market_cap, 1);
        assert_eq!(meta.error_count, 0);
        assert_eq!(report.headline(), "1 Fallen Angels Found");
    }

    #[tokio::test]
    async fn test_scan_is_idempotent() {
        let provider = InMemoryProvider::new();
        for (i, name) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            provider.insert_series(fallen_series(name));
            provider.insert_fundamentals(fundamentals(name, 3e9 + i as f64 * 1e9));
        }
        provider.insert_series(steady_series("CALM"));

        let scanner = scanner_over(provider, ScanConfig::default());
        let universe = tickers(&["E", "CALM", "A", "D", "B", "C"]);

        let first = scanner.scan(&universe).await.unwrap();
        let second = scanner.scan(&universe).await.unwrap();

        assert_eq!(first.candidates.len(), 5);
        assert_eq!(
            serde_json::to_string(&first.candidates).unwrap(),
            serde_json::to_string(&second.candidates).unwrap()
        );
        // Identical risk and gain, so ticker decides the order
        let order: Vec<&str> = first.candidates.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(first.metadata.skipped.shallow_drop, 1);
    }

    #[tokio::test]
    async fn test_per_ticker_errors_are_aggregated() {
        let provider = InMemoryProvider::new();
        provider.insert_series(fallen_series("GOOD"));
        provider.insert_fundamentals(fundamentals("GOOD", 10e9));
        provider.insert_series(series("SHORT", &[100.0; 40]));

        let report = scanner_over(provider, ScanConfig::default())
            .scan(&tickers(&["MISSING", "GOOD", "SHORT", "GOOD"]))
            .await
            .unwrap();

        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.metadata.tickers_scanned, 3);
        assert_eq!(report.metadata.skipped.insufficient_history, 1);
        assert_eq!(report.metadata.error_count, 1);
        assert_eq!(report.metadata.errors[0].ticker, "MISSING");
        assert_eq!(report.metadata.errors[0].kind, "provider");
    }

    #[tokio::test]
    async fn test_missing_fundamentals_score_worst_case() {
        let provider = InMemoryProvider::new();
        provider.insert_series(fallen_series("NOFUND"));

        let config = ScanConfig {
            min_market_cap: 0.0,
            ..ScanConfig::default()
        };
        let report = scanner_over(provider, config)
            .scan(&tickers(&["NOFUND"]))
            .await
            .unwrap();

        // Qualified, then rejected: no market cap to check against the floor
        assert_eq!(report.metadata.tickers_qualified, 1);
        assert!(report.is_empty());
        assert_eq!(report.metadata.skipped.below_market_cap, 1);
        assert_eq!(report.metadata.error_count, 0);
    }

    #[tokio::test]
    async fn test_missing_volatility_is_derived_from_stability_window() {
        let provider = InMemoryProvider::new();
        provider.insert_series(fallen_series("X"));
        provider.insert_fundamentals(Fundamentals {
            volatility: None,
            ..fundamentals("X", 10e9)
        });

        let derived = scanner_over(provider, ScanConfig::default())
            .scan(&tickers(&["X"]))
            .await
            .unwrap();
        let x = &derived.candidates[0];
        // The calm window swings 2.5% a day, roughly 0.4 annualized
        assert!(x.risk.components.volatility > 3.0);
        assert!(x.risk.components.volatility < 10.0);

        let provider = InMemoryProvider::new();
        provider.insert_series(fallen_series("X"));
        provider.insert_fundamentals(Fundamentals {
            volatility: None,
            ..fundamentals("X", 10e9)
        });
        let config = ScanConfig {
            derive_missing_volatility: false,
            ..ScanConfig::default()
        };
        let worst = scanner_over(provider, config)
            .scan(&tickers(&["X"]))
            .await
            .unwrap();
        assert_eq!(worst.candidates[0].risk.components.volatility, 10.0);
    }

    struct SlowProvider {
        inner: InMemoryProvider,
        slow: &'static str,
    }

    #[async_trait]
    impl PriceSeriesProvider for SlowProvider {
        async fn price_series(&self, ticker: &str) -> Result<PriceSeries, ScanError> {
            if ticker == self.slow {
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            self.inner.price_series(ticker).await
        }
    }

    #[tokio::test]
    async fn test_slow_ticker_times_out_without_blocking_batch() {
        let inner = InMemoryProvider::new();
        inner.insert_series(fallen_series("FAST"));
        inner.insert_fundamentals(fundamentals("FAST", 10e9));
        inner.insert_series(fallen_series("SLOW"));
        inner.insert_fundamentals(fundamentals("SLOW", 10e9));

        let fundamentals_source = Arc::new(InMemoryProvider::new());
        fundamentals_source.insert_fundamentals(fundamentals("FAST", 10e9));
        fundamentals_source.insert_fundamentals(fundamentals("SLOW", 10e9));

        let config = ScanConfig {
            fetch_timeout_secs: 1,
            ..ScanConfig::default()
        };
        let scanner = FallenAngelScanner::new(
            config,
            Arc::new(SlowProvider { inner, slow: "SLOW" }),
            fundamentals_source,
        )
        .unwrap();

        let report = scanner.scan(&tickers(&["SLOW", "FAST"])).await.unwrap();
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].ticker, "FAST");
        assert_eq!(report.metadata.errors.len(), 1);
        assert_eq!(report.metadata.errors[0].ticker, "SLOW");
        assert_eq!(report.metadata.errors[0].kind, "timeout");
    }

    struct PanickingProvider {
        inner: InMemoryProvider,
    }

    #[async_trait]
    impl PriceSeriesProvider for PanickingProvider {
        async fn price_series(&self, ticker: &str) -> Result<PriceSeries, ScanError> {
            if ticker == "BOOM" {
                panic!("price feed crashed");
            }
            self.inner.price_series(ticker).await
        }
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported_under_its_ticker() {
        let inner = InMemoryProvider::new();
        inner.insert_series(fallen_series("GOOD"));
        let fundamentals_source = Arc::new(InMemoryProvider::new());
        fundamentals_source.insert_fundamentals(fundamentals("GOOD", 10e9));

        let scanner = FallenAngelScanner::new(
            ScanConfig::default(),
            Arc::new(PanickingProvider { inner }),
            fundamentals_source,
        )
        .unwrap();

        let report = scanner.scan(&tickers(&["BOOM", "GOOD"])).await.unwrap();
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].ticker, "GOOD");
        assert_eq!(report.metadata.error_count, 1);
        assert_eq!(report.metadata.errors[0].ticker, "BOOM");
        assert!(report.metadata.errors[0].message.contains("panic"));
    }

    #[tokio::test]
    async fn test_malformed_file_is_recorded_and_batch_continues() {
        let dir = std::env::temp_dir().join(format!(
            "fallen-angel-scan-malformed-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let good = TickerFile {
            prices: fallen_series("GOOD").points().to_vec(),
            fundamentals: Some(FundamentalsRecord {
                debt_to_equity: Some(0.4),
                current_ratio: Some(1.8),
                market_cap: Some(10e9),
                volatility: Some(0.25),
            }),
        };
        std::fs::write(dir.join("GOOD.json"), serde_json::to_string(&good).unwrap()).unwrap();
        std::fs::write(
            dir.join("BAD.json"),
            r#"{"prices": [
                {"date": "2025-06-03", "close": 100.0},
                {"date": "2025-06-02", "close": 99.0}
            ]}"#,
        )
        .unwrap();

        let provider = Arc::new(JsonDirectoryProvider::new(&dir));
        let scanner = FallenAngelScanner::new(ScanConfig::default(), provider.clone(), provider)
            .unwrap();
        let report = scanner.scan(&tickers(&["BAD", "GOOD"])).await.unwrap();

        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].ticker, "GOOD");
        assert_eq!(report.metadata.error_count, 1);
        assert_eq!(report.metadata.errors[0].ticker, "BAD");
        assert_eq!(report.metadata.errors[0].kind, "malformed_series");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_stale_ticker_counted_as_stale() {
        let provider = InMemoryProvider::new();
        provider.insert_series(fallen_series("OLD"));
        let last = fallen_series("OLD").last().unwrap().date;

        let config = ScanConfig {
            as_of: Some(last + chrono::Duration::days(30)),
            ..ScanConfig::default()
        };
        let report = scanner_over(provider, config)
            .scan(&tickers(&["OLD"]))
            .await
            .unwrap();

        assert_eq!(report.metadata.skipped.stale, 1);
        assert_eq!(report.metadata.skipped.insufficient_history, 0);
        assert_eq!(report.metadata.error_count, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let provider = Arc::new(InMemoryProvider::new());
        let config = ScanConfig {
            max_candidates: 0,
            ..ScanConfig::default()
        };
        let err = FallenAngelScanner::new(config, provider.clone(), provider)
            .err()
            .unwrap();
        assert_eq!(err.kind(), "configuration");
    }

    #[tokio::test]
    async fn test_empty_universe() {
        let report = scanner_over(InMemoryProvider::new(), ScanConfig::default())
            .scan(&[])
            .await
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(report.metadata.tickers_scanned, 0);
        assert_eq!(report.headline(), "No Fallen Angels Today");
    }
}
