//! fallen-angel-scanner: scan a ticker universe for previously calm stocks that just
//! suffered a large compounded drop, score their bankruptcy risk and report a ranked
//! shortlist.
//!
//! Price histories and fundamentals are read from a directory of `<TICKER>.json` files.
//!
//! Usage:
//!   cargo run -p fallen-angel-scanner -- --data-dir data
//!   cargo run -p fallen-angel-scanner -- --tickers PKO.WA,SAP.DE,INTC --json-out out/report.json
//!   cargo run -p fallen-angel-scanner -- --markets wse,xetra --html-out out/report.html
//!   cargo run -p fallen-angel-scanner -- --all-files --min-drop 0.25 --as-of 2025-06-30

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use report_sink::{ReportService, SinkConfig};
use scan_orchestrator::{FallenAngelScanner, JsonDirectoryProvider};
use scanner_core::{Market, MarketTable, ScanConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "fallen-angel-scanner", about = "Multi-market fallen angel scanner")]
struct Cli {
    /// Directory holding one <TICKER>.json file per ticker
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Explicit tickers to scan (comma separated)
    #[arg(long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// JSON market table replacing the built-in ticker lists
    #[arg(long, env = "MARKET_TABLE")]
    market_table: Option<PathBuf>,

    /// Restrict the market table to these markets (us, wse, lse, tase, xetra)
    #[arg(long, value_delimiter = ',')]
    markets: Vec<String>,

    /// Scan every ticker file found in the data directory
    #[arg(long)]
    all_files: bool,

    /// Write the full report as JSON
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Write the report as an HTML page
    #[arg(long)]
    html_out: Option<PathBuf>,

    /// Minimum compounded drop as a fraction (0.20 = 20%)
    #[arg(long)]
    min_drop: Option<f64>,

    #[arg(long)]
    stable_days: Option<usize>,

    #[arg(long)]
    drop_days: Option<usize>,

    #[arg(long)]
    min_market_cap: Option<f64>,

    #[arg(long)]
    max_candidates: Option<usize>,

    #[arg(long)]
    concurrency: Option<usize>,

    /// Evaluate as of this date (YYYY-MM-DD); later prices are ignored
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

impl Cli {
    /// Flags win over environment values
    fn apply_overrides(&self, config: &mut ScanConfig) {
        if let Some(v) = self.min_drop {
            config.min_drop_percent = v;
        }
        if let Some(v) = self.stable_days {
            config.stable_window_days = v;
        }
        if let Some(v) = self.drop_days {
            config.drop_window_days = v;
        }
        if let Some(v) = self.min_market_cap {
            config.min_market_cap = v;
        }
        if let Some(v) = self.max_candidates {
            config.max_candidates = v;
        }
        if let Some(v) = self.concurrency {
            config.max_concurrency = v;
        }
        if self.as_of.is_some() {
            config.as_of = self.as_of;
        }
    }

    fn sink_config(&self) -> anyhow::Result<SinkConfig> {
        let mut sinks = SinkConfig::from_env().context("invalid report configuration")?;
        if self.json_out.is_some() {
            sinks.json_path = self.json_out.clone();
        }
        if self.html_out.is_some() {
            sinks.html_path = self.html_out.clone();
        }
        Ok(sinks)
    }

    async fn load_market_table(&self) -> anyhow::Result<MarketTable> {
        let table = match &self.market_table {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading market table {}", path.display()))?;
                MarketTable::from_json_str(&raw)?
            }
            None => MarketTable::default(),
        };

        if self.markets.is_empty() {
            return Ok(table);
        }
        let markets = self
            .markets
            .iter()
            .map(|m| m.parse::<Market>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(table.restricted_to(&markets))
    }

    async fn resolve_tickers(&self, provider: &JsonDirectoryProvider) -> anyhow::Result<Vec<String>> {
        if !self.tickers.is_empty() {
            return Ok(self
                .tickers
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect());
        }
        if self.all_files {
            return Ok(provider.list_tickers().await?);
        }
        Ok(self.load_market_table().await?.tickers())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "fallen_angel_scanner=info,scan_orchestrator=info,report_sink=info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "fallen_angel_scanner=info,scan_orchestrator=info,report_sink=info".into()),
            )
            .init();
    }

    let cli = Cli::parse();

    let mut config = ScanConfig::from_env().context("invalid scan configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid scan configuration")?;

    tracing::info!("Fallen angel scanner starting");
    tracing::info!(
        "  Windows: {} stable days, {} drop days",
        config.stable_window_days,
        config.drop_window_days
    );
    tracing::info!("  Min drop: {:.0}%", config.min_drop_percent * 100.0);
    tracing::info!("  Min market cap: ${:.1}B", config.min_market_cap / 1e9);
    tracing::info!("  Risk ceiling: {:.1}", config.admission_risk_ceiling);

    let sinks = cli.sink_config()?;

    let provider = Arc::new(JsonDirectoryProvider::new(&cli.data_dir));
    let tickers = cli.resolve_tickers(&provider).await?;
    tracing::info!(
        "Scanning {} tickers from {}",
        tickers.len(),
        provider.root().display()
    );

    let scanner = FallenAngelScanner::new(config, provider.clone(), provider)?;
    let report = scanner.scan(&tickers).await?;

    let service = ReportService::new(&sinks);
    service
        .deliver_all(&report)
        .await
        .context("delivering scan report")?;

    Ok(())
}
