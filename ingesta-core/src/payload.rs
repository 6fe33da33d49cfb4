//! Row model: what providers return and what the store persists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{DataType, IngestError};

/// One OHLCV bar (daily or intraday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Ticker symbol.
    pub symbol: String,
    /// Bar open time (UTC).
    pub ts: DateTime<Utc>,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Split/dividend adjusted close, when the provider supplies it.
    pub adj_close: Option<Decimal>,
    /// Traded volume.
    pub volume: Option<u64>,
}

/// Snapshot of fundamental metrics for one reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    /// Ticker symbol.
    pub symbol: String,
    /// When the snapshot was taken or the period ended.
    pub as_of: DateTime<Utc>,
    /// Reporting period label, e.g. "TTM" or "2025Q1".
    pub period: String,
    /// Market capitalization.
    pub market_cap: Option<Decimal>,
    /// Price to earnings ratio.
    pub pe_ratio: Option<Decimal>,
    /// Earnings per share.
    pub eps: Option<Decimal>,
    /// Revenue for the period.
    pub revenue: Option<Decimal>,
    /// Net profit margin.
    pub profit_margin: Option<Decimal>,
    /// Debt to equity ratio.
    pub debt_to_equity: Option<Decimal>,
    /// Trailing dividend yield.
    pub dividend_yield: Option<Decimal>,
}

/// A news article mentioning a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Ticker symbol the article was fetched for.
    pub symbol: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Headline.
    pub title: String,
    /// Canonical URL; unique per article.
    pub url: String,
    /// Publisher name.
    pub publisher: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Provider sentiment score in [-1, 1].
    pub sentiment: Option<Decimal>,
}

/// An earnings report or scheduled report with estimates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsEvent {
    /// Ticker symbol.
    pub symbol: String,
    /// Report date.
    pub report_date: DateTime<Utc>,
    /// Fiscal period label, e.g. "2025Q1".
    pub fiscal_period: String,
    /// Reported EPS.
    pub eps_actual: Option<Decimal>,
    /// Consensus EPS estimate.
    pub eps_estimate: Option<Decimal>,
    /// Reported revenue.
    pub revenue_actual: Option<Decimal>,
    /// Consensus revenue estimate.
    pub revenue_estimate: Option<Decimal>,
}

/// A peer relationship between two symbols in the same industry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerLink {
    /// Ticker symbol.
    pub symbol: String,
    /// Peer ticker symbol.
    pub peer: String,
    /// When the relationship was observed.
    pub as_of: DateTime<Utc>,
    /// Shared industry, when known.
    pub industry: Option<String>,
}

/// One observation of a macro-economic series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroObservation {
    /// Series identifier, e.g. "CPIAUCSL".
    pub series_id: String,
    /// Observation date.
    pub ts: DateTime<Utc>,
    /// Observed value.
    pub value: Decimal,
}

/// Identity of a persisted row. Upserts are keyed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    /// Ticker symbol or series id.
    pub symbol: String,
    /// Row timestamp.
    pub ts: DateTime<Utc>,
    /// Provider (or local computer) that produced the row.
    pub source: String,
    /// Distinguishes rows sharing (symbol, ts, source); empty when unused.
    pub discriminator: String,
}

/// A row in persistable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    /// Data type, which also selects the table.
    pub data_type: DataType,
    /// Natural key within the table.
    pub key: NaturalKey,
    /// Row content.
    pub body: serde_json::Value,
}

impl StoredRow {
    /// Decode the body into a typed row.
    ///
    /// # Errors
    /// Returns `Storage` when the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, IngestError> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            IngestError::Storage(format!(
                "{} row {}@{} does not decode: {e}",
                self.data_type, self.key.symbol, self.key.ts
            ))
        })
    }
}

/// Common accessors every typed row provides for keying.
pub trait Row: Serialize + DeserializeOwned {
    /// Symbol (or series id) the row belongs to.
    fn symbol(&self) -> &str;
    /// Row timestamp.
    fn ts(&self) -> DateTime<Utc>;
    /// Extra key component; empty by default.
    fn discriminator(&self) -> String {
        String::new()
    }

    /// Natural key of this row for the given source.
    fn natural_key(&self, source: &str) -> NaturalKey {
        NaturalKey {
            symbol: self.symbol().to_string(),
            ts: self.ts(),
            source: source.to_string(),
            discriminator: self.discriminator(),
        }
    }

    /// Persistable form of this row.
    ///
    /// # Errors
    /// Returns `Storage` if the row cannot be serialized.
    fn to_stored(&self, data_type: DataType, source: &str) -> Result<StoredRow, IngestError> {
        let body = serde_json::to_value(self)
            .map_err(|e| IngestError::Storage(format!("serialize {data_type} row: {e}")))?;
        Ok(StoredRow {
            data_type,
            key: self.natural_key(source),
            body,
        })
    }
}

impl Row for PriceBar {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn ts(&self) -> DateTime<Utc> {
        self.ts
    }
}

impl Row for FundamentalsSnapshot {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn ts(&self) -> DateTime<Utc> {
        self.as_of
    }
    fn discriminator(&self) -> String {
        self.period.clone()
    }
}

impl Row for NewsArticle {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn ts(&self) -> DateTime<Utc> {
        self.published_at
    }
    fn discriminator(&self) -> String {
        self.url.clone()
    }
}

impl Row for EarningsEvent {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn ts(&self) -> DateTime<Utc> {
        self.report_date
    }
    fn discriminator(&self) -> String {
        self.fiscal_period.clone()
    }
}

impl Row for PeerLink {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn ts(&self) -> DateTime<Utc> {
        self.as_of
    }
    fn discriminator(&self) -> String {
        self.peer.clone()
    }
}

impl Row for MacroObservation {
    fn symbol(&self) -> &str {
        &self.series_id
    }
    fn ts(&self) -> DateTime<Utc> {
        self.ts
    }
}

/// Typed provider response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Daily or intraday bars.
    Prices(Vec<PriceBar>),
    /// Fundamentals snapshots.
    Fundamentals(Vec<FundamentalsSnapshot>),
    /// News articles.
    News(Vec<NewsArticle>),
    /// Earnings events.
    Earnings(Vec<EarningsEvent>),
    /// Peer links.
    Peers(Vec<PeerLink>),
    /// Macro observations.
    Macro(Vec<MacroObservation>),
}

impl Payload {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Prices(v) => v.len(),
            Self::Fundamentals(v) => v.len(),
            Self::News(v) => v.len(),
            Self::Earnings(v) => v.len(),
            Self::Peers(v) => v.len(),
            Self::Macro(v) => v.len(),
        }
    }

    /// Whether the payload has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this payload shape is what `data_type` expects.
    #[must_use]
    pub const fn fits(&self, data_type: DataType) -> bool {
        matches!(
            (self, data_type),
            (
                Self::Prices(_),
                DataType::PriceHistorical | DataType::PriceIntraday
            ) | (Self::Fundamentals(_), DataType::Fundamentals)
                | (Self::News(_), DataType::News)
                | (Self::Earnings(_), DataType::Earnings)
                | (Self::Peers(_), DataType::IndustryPeers)
                | (Self::Macro(_), DataType::Macro)
        )
    }

    /// Empty payload of the shape `data_type` expects; `None` for locally computed types.
    #[must_use]
    pub const fn empty_for(data_type: DataType) -> Option<Self> {
        Some(match data_type {
            DataType::PriceHistorical | DataType::PriceIntraday => Self::Prices(Vec::new()),
            DataType::Fundamentals => Self::Fundamentals(Vec::new()),
            DataType::News => Self::News(Vec::new()),
            DataType::Earnings => Self::Earnings(Vec::new()),
            DataType::IndustryPeers => Self::Peers(Vec::new()),
            DataType::Macro => Self::Macro(Vec::new()),
            DataType::TechnicalIndicators => return None,
        })
    }

    /// Flatten into persistable rows tagged with `source`.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the payload shape does not fit `data_type`,
    /// or `Storage` if a row cannot be serialized.
    pub fn to_rows(&self, data_type: DataType, source: &str) -> Result<Vec<StoredRow>, IngestError> {
        fn convert<R: Row>(
            rows: &[R],
            data_type: DataType,
            source: &str,
        ) -> Result<Vec<StoredRow>, IngestError> {
            rows.iter().map(|r| r.to_stored(data_type, source)).collect()
        }
        if !self.fits(data_type) {
            return Err(IngestError::InvalidArg(format!(
                "payload does not fit data type {data_type}"
            )));
        }
        match self {
            Self::Prices(v) => convert(v, data_type, source),
            Self::Fundamentals(v) => convert(v, data_type, source),
            Self::News(v) => convert(v, data_type, source),
            Self::Earnings(v) => convert(v, data_type, source),
            Self::Peers(v) => convert(v, data_type, source),
            Self::Macro(v) => convert(v, data_type, source),
        }
    }
}
