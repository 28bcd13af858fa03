mod templates;

pub use templates::ReportTemplate;

use async_trait::async_trait;
use scanner_core::{ReportSink, ScanError, ScanReport};
use std::path::{Path, PathBuf};

/// Where finished reports go.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub json_path: Option<PathBuf>,
    pub html_path: Option<PathBuf>,
    /// Candidates listed in the log summary
    pub log_top: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            json_path: None,
            html_path: None,
            log_top: 5,
        }
    }
}

impl SinkConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self, ScanError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// An unparsable `REPORT_LOG_TOP` is a configuration error, not a silent default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScanError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| {
            lookup(key)
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
        };

        let log_top = match lookup("REPORT_LOG_TOP").filter(|s| !s.trim().is_empty()) {
            Some(raw) => raw.trim().parse().map_err(|e| {
                ScanError::Configuration(format!("REPORT_LOG_TOP: invalid value '{}': {}", raw, e))
            })?,
            None => Self::default().log_top,
        };

        Ok(Self {
            json_path: path("REPORT_JSON_PATH"),
            html_path: path("REPORT_HTML_PATH"),
            log_top,
        })
    }
}

/// Dispatches a report to every configured sink.
pub struct ReportService {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl ReportService {
    pub fn new(config: &SinkConfig) -> Self {
        let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(LogReportSink::new(config.log_top))];

        if let Some(ref path) = config.json_path {
            tracing::info!("JSON report enabled -> {}", path.display());
            sinks.push(Box::new(JsonReportSink::new(path)));
        }
        if let Some(ref path) = config.html_path {
            tracing::info!("HTML report enabled -> {}", path.display());
            sinks.push(Box::new(HtmlReportSink::new(path)));
        }

        Self { sinks }
    }

    pub fn with_sinks(sinks: Vec<Box<dyn ReportSink>>) -> Self {
        Self { sinks }
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Deliver to all sinks. One failing sink does not stop the others.
    pub async fn deliver_all(&self, report: &ScanReport) -> Result<(), ScanError> {
        let mut failures = Vec::new();

        for sink in &self.sinks {
            match sink.deliver(report).await {
                Ok(()) => tracing::debug!("Delivered report via {}", sink.name()),
                Err(e) => {
                    tracing::warn!("Failed to deliver report via {}: {}", sink.name(), e);
                    failures.push(format!("{}: {}", sink.name(), e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScanError::Report(failures.join("; ")))
        }
    }
}

/// Summary to the tracing log: headline, counts and the top candidates.
pub struct LogReportSink {
    top: usize,
}

impl LogReportSink {
    pub fn new(top: usize) -> Self {
        Self { top }
    }

    pub fn summary_lines(&self, report: &ScanReport) -> Vec<String> {
        let meta = &report.metadata;
        let mut lines = vec![format!(
            "{}: {} scanned, {} dropped, {} errors, {}ms",
            report.headline(),
            meta.tickers_scanned,
            meta.tickers_qualified,
            meta.error_count,
            meta.elapsed_ms
        )];

        for (i, c) in report.candidates.iter().take(self.top).enumerate() {
            lines.push(format!(
                "{}. {} ({}) - {:.1}% drop, +{:.1}% potential, risk {:.1} ({})",
                i + 1,
                c.ticker,
                c.market.label(),
                c.drop.cumulative_drop_pct * 100.0,
                c.potential_gain_pct * 100.0,
                c.risk.risk_score,
                c.risk.bankruptcy_risk.label()
            ));
        }
        lines
    }
}

#[async_trait]
impl ReportSink for LogReportSink {
    async fn deliver(&self, report: &ScanReport) -> Result<(), ScanError> {
        for line in self.summary_lines(report) {
            tracing::info!("{}", line);
        }
        for error in &report.metadata.errors {
            tracing::debug!("{} [{}]: {}", error.ticker, error.kind, error.message);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Pretty-printed JSON of the whole report.
pub struct JsonReportSink {
    path: PathBuf,
}

impl JsonReportSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ReportSink for JsonReportSink {
    async fn deliver(&self, report: &ScanReport) -> Result<(), ScanError> {
        let body = serde_json::to_string_pretty(report)
            .map_err(|e| ScanError::Report(format!("serialize report: {}", e)))?;
        write_file(&self.path, body).await
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Standalone HTML page with the candidate table.
pub struct HtmlReportSink {
    path: PathBuf,
}

impl HtmlReportSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ReportSink for HtmlReportSink {
    async fn deliver(&self, report: &ScanReport) -> Result<(), ScanError> {
        write_file(&self.path, ReportTemplate::render(report)).await
    }

    fn name(&self) -> &str {
        "html"
    }
}

async fn write_file(path: &Path, body: String) -> Result<(), ScanError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ScanError::Report(format!("{}: {}", parent.display(), e)))?;
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|e| ScanError::Report(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use scanner_core::{
        BankruptcyRisk, Candidate, DateRange, DropEvent, Market, RiskAssessment, RiskComponents,
        ScanMetadata, SkipCounts, TickerError,
    };

    fn candidate(ticker: &str, risk_score: f64) -> Candidate {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        Candidate {
            ticker: ticker.to_string(),
            market: Market::from_ticker(ticker),
            drop: DropEvent {
                ticker: ticker.to_string(),
                stability_window: DateRange { start: d(1), end: d(10) },
                drop_window: DateRange { start: d(11), end: d(30) },
                cumulative_drop_pct: 0.30,
                pre_drop_reference_price: 100.0,
                current_price: 70.0,
                stability_range_ratio: 0.05,
                weekly_returns: vec![-0.30],
            },
            risk: RiskAssessment {
                ticker: ticker.to_string(),
                risk_score,
                bankruptcy_risk: BankruptcyRisk::from_score(risk_score),
                components: RiskComponents {
                    debt_to_equity: 2.4,
                    current_ratio: 2.8,
                    drop_severity: 5.0,
                    volatility: 3.0,
                },
            },
            potential_gain_pct: 0.4286,
            market_cap: 10e9,
        }
    }

    fn report(candidates: Vec<Candidate>) -> ScanReport {
        ScanReport {
            metadata: ScanMetadata {
                started_at: Utc::now(),
                elapsed_ms: 12,
                tickers_scanned: 40,
                tickers_qualified: candidates.len(),
                candidates_admitted: candidates.len(),
                skipped: SkipCounts::default(),
                error_count: 1,
                errors: vec![TickerError {
                    ticker: "BROKEN".to_string(),
                    kind: "provider".to_string(),
                    message: "no price history".to_string(),
                }],
            },
            candidates,
        }
    }

    fn temp_root(test: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fallen-angel-{}-{}", test, std::process::id()))
    }

    struct FailingSink;

    #[async_trait]
    impl ReportSink for FailingSink {
        async fn deliver(&self, _report: &ScanReport) -> Result<(), ScanError> {
            Err(ScanError::Report("disk full".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_sink_config_from_lookup() {
        let config = SinkConfig::from_lookup(lookup(&[
            ("REPORT_JSON_PATH", "out/report.json"),
            ("REPORT_HTML_PATH", ""),
            ("REPORT_LOG_TOP", "10"),
        ]))
        .unwrap();

        assert_eq!(config.json_path, Some(PathBuf::from("out/report.json")));
        assert_eq!(config.html_path, None);
        assert_eq!(config.log_top, 10);
        assert_eq!(SinkConfig::from_lookup(lookup(&[])).unwrap().log_top, 5);
    }

    #[test]
    fn test_unparsable_log_top_is_configuration_error() {
        let err = SinkConfig::from_lookup(lookup(&[("REPORT_LOG_TOP", "five")])).unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("REPORT_LOG_TOP"));

        assert!(SinkConfig::from_lookup(lookup(&[("REPORT_LOG_TOP", "-1")])).is_err());
    }

    #[test]
    fn test_log_summary_lists_top_candidates() {
        let rows: Vec<Candidate> = (0..8).map(|i| candidate(&format!("T{}", i), 3.17)).collect();
        let lines = LogReportSink::new(5).summary_lines(&report(rows));

        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("8 Fallen Angels Found"));
        assert_eq!(lines[1], "1. T0 (US) - 30.0% drop, +42.9% potential, risk 3.2 (Low)");
    }

    #[test]
    fn test_html_renders_candidate_rows() {
        let html = ReportTemplate::render(&report(vec![
            candidate("PKO.WA", 3.17),
            candidate("<X>", 6.0),
        ]));

        assert!(html.contains("2 Fallen Angels Found"));
        assert!(html.contains("PKO.WA"));
        assert!(html.contains("WSE"));
        assert!(html.contains("70.00 PLN"));
        assert!(html.contains("-30.0%"));
        assert!(html.contains("+42.9%"));
        assert!(html.contains("mBank eMakler"));
        assert!(html.contains("&lt;X&gt;"));
        assert!(!html.contains("<X>"));
        assert!(html.contains("1 tickers failed to load"));
    }

    #[test]
    fn test_html_for_empty_report() {
        let html = ReportTemplate::render(&report(Vec::new()));
        assert!(html.contains("No Fallen Angels Today"));
        assert!(!html.contains("Potential Gain"));
    }

    #[tokio::test]
    async fn test_file_sinks_write_reports() {
        let root = temp_root("file-sinks");
        let json_path = root.join("out/report.json");
        let html_path = root.join("out/report.html");
        let service = ReportService::new(&SinkConfig {
            json_path: Some(json_path.clone()),
            html_path: Some(html_path.clone()),
            log_top: 5,
        });
        assert_eq!(service.sink_names(), vec!["log", "json", "html"]);

        let original = report(vec![candidate("SAP.DE", 3.17)]);
        service.deliver_all(&original).await.unwrap();

        let raw = std::fs::read_to_string(&json_path).unwrap();
        let parsed: ScanReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.candidates[0].ticker, "SAP.DE");
        assert_eq!(parsed.metadata.errors, original.metadata.errors);
        assert!(std::fs::read_to_string(&html_path).unwrap().contains("SAP.DE"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_others() {
        let root = temp_root("failing-sink");
        let path = root.join("report.json");
        let service = ReportService::with_sinks(vec![
            Box::new(FailingSink),
            Box::new(JsonReportSink::new(&path)),
        ]);

        let err = service.deliver_all(&report(Vec::new())).await.unwrap_err();
        assert_eq!(err.kind(), "report");
        assert!(err.to_string().contains("failing: Report error: disk full"));
        assert!(path.exists());

        let _ = std::fs::remove_dir_all(&root);
    }
}
