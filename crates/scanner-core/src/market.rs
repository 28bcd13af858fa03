//! Market classification and the per-market ticker table.
//!
//! Tickers carry their exchange in a suffix (`PKO.WA`, `SHEL.L`); bare symbols are US
//! listings. The [`MarketTable`] is the editable universe: each market lists bare
//! symbols and the suffix convention is applied when the universe is assembled.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Market {
    Us,
    Wse,
    Lse,
    Tase,
    Xetra,
}

impl Market {
    pub const ALL: [Market; 5] = [Market::Us, Market::Wse, Market::Lse, Market::Tase, Market::Xetra];

    /// Classify a ticker by its exchange suffix
    pub fn from_ticker(ticker: &str) -> Self {
        Self::ALL
            .into_iter()
            .filter(|m| !m.suffix().is_empty())
            .find(|m| ticker.ends_with(m.suffix()))
            .unwrap_or(Market::Us)
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Market::Us => "",
            Market::Wse => ".WA",
            Market::Lse => ".L",
            Market::Tase => ".TA",
            Market::Xetra => ".DE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Market::Us => "US",
            Market::Wse => "WSE",
            Market::Lse => "LSE",
            Market::Tase => "TASE",
            Market::Xetra => "XETRA",
        }
    }

    pub fn currency(&self) -> &'static str {
        match self {
            Market::Us => "USD",
            Market::Wse => "PLN",
            Market::Lse => "GBP",
            Market::Tase => "ILS",
            Market::Xetra => "EUR",
        }
    }

    /// Apply this market's suffix to a bare symbol. Already-suffixed symbols pass through.
    pub fn qualify(&self, symbol: &str) -> String {
        let symbol = symbol.trim();
        if self.suffix().is_empty() || symbol.ends_with(self.suffix()) {
            symbol.to_string()
        } else {
            format!("{}{}", symbol, self.suffix())
        }
    }

    pub fn broker(&self) -> BrokerRecommendation {
        match self {
            Market::Us => BrokerRecommendation {
                primary: "Revolut",
                alternative: Some("mBank eMakler"),
                reason: "Lower fees + extended hours",
            },
            Market::Wse => BrokerRecommendation {
                primary: "mBank eMakler",
                alternative: None,
                reason: "Local market, best execution",
            },
            Market::Lse => BrokerRecommendation {
                primary: "mBank eMakler",
                alternative: Some("Revolut"),
                reason: "Full FTSE access, lower fees",
            },
            Market::Tase => BrokerRecommendation {
                primary: "Bank Leumi",
                alternative: None,
                reason: "Only broker with TASE access",
            },
            Market::Xetra => BrokerRecommendation {
                primary: "mBank eMakler",
                alternative: None,
                reason: "Full DAX access, good fees",
            },
        }
    }
}

impl std::str::FromStr for Market {
    type Err = ScanError;

    /// Accepts the display label (`wse`, `XETRA`) case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScanError::Configuration(format!("unknown market '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BrokerRecommendation {
    pub primary: &'static str,
    pub alternative: Option<&'static str>,
    pub reason: &'static str,
}

/// One market's bare symbol list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUniverse {
    pub market: Market,
    pub symbols: Vec<String>,
}

/// Editable ticker universe, loaded once per scan and passed by value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTable {
    /// Fully-qualified tickers scanned before everything else
    #[serde(default)]
    pub priority: Vec<String>,
    pub markets: Vec<MarketUniverse>,
}

impl MarketTable {
    pub fn from_json_str(raw: &str) -> Result<Self, ScanError> {
        let table: MarketTable = serde_json::from_str(raw)
            .map_err(|e| ScanError::Configuration(format!("invalid market table: {}", e)))?;
        if table.markets.iter().all(|m| m.symbols.is_empty()) && table.priority.is_empty() {
            return Err(ScanError::Configuration("market table has no symbols".to_string()));
        }
        Ok(table)
    }

    /// Keep only the listed markets (priority tickers are filtered by their suffix too)
    pub fn restricted_to(mut self, markets: &[Market]) -> Self {
        self.markets.retain(|m| markets.contains(&m.market));
        self.priority.retain(|t| markets.contains(&Market::from_ticker(t)));
        self
    }

    /// Priority tickers first, then each market in table order, de-duplicated keeping
    /// the first occurrence.
    pub fn tickers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let qualified = self.priority.iter().map(|t| t.trim().to_string()).chain(
            self.markets
                .iter()
                .flat_map(|m| m.symbols.iter().map(move |s| m.market.qualify(s))),
        );

        qualified
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tickers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for MarketTable {
    fn default() -> Self {
        Self {
            priority: symbols(&[
                // Recently removed from NASDAQ-100
                "TTD", "LULU", "CDW", "GFS", "ON", "BIIB",
                // Recently removed from S&P 500
                "ENPH", "CZR", "MKTX",
                // Known underperformers
                "ZS", "RIVN", "LCID", "MRNA", "WBD", "INTC",
            ]),
            markets: vec![
                MarketUniverse {
                    market: Market::Us,
                    symbols: symbols(&[
                        "AAPL", "MSFT", "GOOGL", "GOOG", "AMZN", "NVDA", "META", "TSLA",
                        "BRK.B", "LLY", "V", "UNH", "XOM", "WMT", "JPM", "MA", "JNJ", "PG",
                        "AVGO", "HD", "CVX", "MRK", "ABBV", "COST", "KO", "PEP", "BAC", "NFLX",
                        "TMO", "CRM", "AMD", "MCD", "CSCO", "ACN", "LIN", "ADBE", "ORCL", "ABT",
                        "WFC", "DHR", "NKE", "CMCSA", "TXN", "DIS", "PM", "VZ", "BMY", "UPS",
                        "NEE", "RTX", "ASML", "TMUS", "QCOM", "INTU", "HON", "AMGN", "AMAT",
                        "SBUX", "ISRG", "ADP", "ADI", "GILD", "BKNG", "VRTX", "PANW", "REGN",
                        "LRCX", "MU", "MDLZ", "SNPS", "CDNS", "PYPL", "MRVL", "KLAC", "CRWD",
                        "ORLY", "MAR", "FTNT", "MELI", "CSX", "ADSK", "ABNB", "DASH", "ROP",
                        "WDAY", "NXPI", "CPRT", "PCAR", "CHTR", "AEP", "PAYX", "MNST", "ROST",
                        "ODFL", "EA", "FAST", "KDP", "DXCM", "GEHC", "CTSH", "VRSK", "EXC",
                        "CTAS", "IDXX", "KHC", "XEL", "CCEP", "AZN", "MCHP", "DDOG", "TEAM",
                        "MDB", "ILMN", "ALGN", "ARM", "ALNY", "FER", "INSM", "MPWR", "STX", "WDC",
                    ]),
                },
                MarketUniverse {
                    market: Market::Wse,
                    symbols: symbols(&[
                        "PKO", "PZU", "PKN", "KGH", "PEO", "CDR", "ALE", "DNP", "LPP", "PGE",
                        "JSW", "CCC", "CPS", "OPL", "MBK", "KRU", "BDX", "KTY", "ASB", "LTS",
                        "11B", "ATT", "CIG", "EUR", "ING", "KER", "MIL",
                    ]),
                },
                MarketUniverse {
                    market: Market::Lse,
                    symbols: symbols(&[
                        "SHEL", "AZN", "HSBA", "ULVR", "BP", "GSK", "DGE", "RIO", "BATS", "REL",
                        "NG", "LSEG", "BARC", "LLOY", "VOD", "AAL", "GLEN", "BHP", "CPG", "PRU",
                        "IMB", "TSCO", "BA", "CNA", "RKT", "MNG", "EXPN", "RR", "WPP", "LGEN",
                        "STJ", "INF", "FERG", "III", "NWG", "PSN", "AUTO", "STAN", "SGE", "AV",
                        "ANTO", "SSE", "BT-A", "ENT", "SPX", "SBRY", "BRBY", "WTB", "CRDA",
                    ]),
                },
                MarketUniverse {
                    market: Market::Tase,
                    symbols: symbols(&[
                        "TEVA", "LUMI", "POLI", "ESLT", "ICL", "TATT", "AZRG", "FIBI", "MZTF",
                        "NICE", "TASE", "DLEKG", "MLSR", "BEZQ", "ALHE", "ELAL", "PRCH", "FTAL",
                        "MGRM", "BIGT", "ENLT",
                    ]),
                },
                MarketUniverse {
                    market: Market::Xetra,
                    symbols: symbols(&[
                        "ADS", "AIR", "ALV", "BAS", "BAYN", "BEI", "BMW", "BNR", "CBK", "CON",
                        "DB1", "DBK", "DHL", "DTE", "EOAN", "FME", "FRE", "HEI", "HEN", "HFG",
                        "IFX", "MBG", "MRK", "MTX", "MUV2", "PAH3", "PUM", "QIA", "RHM", "RWE",
                        "SAP", "SHL", "SIE", "SRT", "SY1", "VNA", "VOW3", "ZAL", "HNR1",
                    ]),
                },
            ],
        }
    }
}
