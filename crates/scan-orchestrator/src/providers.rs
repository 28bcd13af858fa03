use async_trait::async_trait;
use dashmap::DashMap;
use scanner_core::{
    Fundamentals, FundamentalsProvider, PricePoint, PriceSeries, PriceSeriesProvider, ScanError,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Provider backed by in-process maps. Used for embedding and tests.
#[derive(Default)]
pub struct InMemoryProvider {
    series: DashMap<String, PriceSeries>,
    fundamentals: DashMap<String, Fundamentals>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_series(&self, series: PriceSeries) {
        self.series.insert(series.ticker().to_string(), series);
    }

    pub fn insert_fundamentals(&self, fundamentals: Fundamentals) {
        self.fundamentals.insert(fundamentals.ticker.clone(), fundamentals);
    }

    pub fn tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.series.iter().map(|e| e.key().clone()).collect();
        tickers.sort();
        tickers
    }
}

#[async_trait]
impl PriceSeriesProvider for InMemoryProvider {
    async fn price_series(&self, ticker: &str) -> Result<PriceSeries, ScanError> {
        self.series
            .get(ticker)
            .map(|s| s.value().clone())
            .ok_or_else(|| ScanError::provider(ticker, "no price history"))
    }
}

#[async_trait]
impl FundamentalsProvider for InMemoryProvider {
    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals, ScanError> {
        self.fundamentals
            .get(ticker)
            .map(|f| f.value().clone())
            .ok_or_else(|| ScanError::MissingFundamentals(ticker.to_string()))
    }
}

/// Fundamentals fields as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalsRecord {
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
    #[serde(default)]
    pub current_ratio: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub volatility: Option<f64>,
}

/// On-disk layout of `<TICKER>.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerFile {
    pub prices: Vec<PricePoint>,
    #[serde(default)]
    pub fundamentals: Option<FundamentalsRecord>,
}

/// Reads one `<TICKER>.json` file per ticker from a directory.
///
/// Any exporter that writes this layout can feed the scanner; the scanner itself never
/// talks to a market data service.
pub struct JsonDirectoryProvider {
    root: PathBuf,
}

impl JsonDirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.root.join(format!("{}.json", ticker))
    }

    async fn load(&self, ticker: &str) -> Result<TickerFile, ScanError> {
        let path = self.path_for(ticker);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ScanError::provider(ticker, format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ScanError::malformed(ticker, format!("{}: {}", path.display(), e)))
    }

    /// Tickers available in the directory, sorted
    pub async fn list_tickers(&self) -> Result<Vec<String>, ScanError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| ScanError::Configuration(format!("{}: {}", self.root.display(), e)))?;

        let mut tickers = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ScanError::Configuration(format!("{}: {}", self.root.display(), e)))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tickers.push(stem.to_string());
                }
            }
        }
        tickers.sort();
        Ok(tickers)
    }
}

#[async_trait]
impl PriceSeriesProvider for JsonDirectoryProvider {
    async fn price_series(&self, ticker: &str) -> Result<PriceSeries, ScanError> {
        let file = self.load(ticker).await?;
        PriceSeries::new(ticker, file.prices)
    }
}

#[async_trait]
impl FundamentalsProvider for JsonDirectoryProvider {
    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals, ScanError> {
        let record = self
            .load(ticker)
            .await?
            .fundamentals
            .ok_or_else(|| ScanError::MissingFundamentals(ticker.to_string()))?;

        Ok(Fundamentals {
            ticker: ticker.to_string(),
            debt_to_equity: record.debt_to_equity,
            current_ratio: record.current_ratio,
            market_cap: record.market_cap,
            volatility: record.volatility,
        })
    }
}
