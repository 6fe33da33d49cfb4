use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payload::{
    EarningsEvent, FundamentalsSnapshot, MacroObservation, NewsArticle, Payload, PeerLink,
    PriceBar,
};
use crate::{DataType, IngestError, ProviderKey};

/// Bar size requested from a price provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BarInterval {
    /// One-minute bars.
    M1,
    /// Five-minute bars.
    M5,
    /// Fifteen-minute bars.
    M15,
    /// Hourly bars.
    H1,
    /// Daily bars.
    #[default]
    D1,
}

/// Parameters of a single provider fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FetchParams {
    /// Inclusive lower bound of the requested range.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound of the requested range.
    pub end: Option<DateTime<Utc>>,
    /// Bar size for price requests.
    pub interval: BarInterval,
    /// Maximum number of rows for list endpoints such as news.
    pub limit: Option<usize>,
}

impl FetchParams {
    /// Range `[start, end)` with the given bar size.
    #[must_use]
    pub const fn range(start: DateTime<Utc>, end: DateTime<Utc>, interval: BarInterval) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            interval,
            limit: None,
        }
    }

    /// Whether `ts` falls inside the requested range. Open bounds always match.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| ts >= s) && self.end.is_none_or(|e| ts < e)
    }
}

/// Focused role trait for providers that serve OHLCV bars.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetch daily bars for the requested range.
    async fn historical_prices(
        &self,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Vec<PriceBar>, IngestError>;

    /// Fetch intraday bars for the requested range.
    ///
    /// Default: unsupported.
    async fn intraday_prices(
        &self,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Vec<PriceBar>, IngestError> {
        let _ = (symbol, params);
        Err(IngestError::unsupported(DataType::PriceIntraday.as_str()))
    }

    /// Whether `intraday_prices` is implemented.
    fn supports_intraday(&self) -> bool {
        false
    }
}

/// Focused role trait for providers that serve fundamentals snapshots.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Fetch the latest fundamentals snapshots.
    async fn fundamentals(&self, symbol: &str) -> Result<Vec<FundamentalsSnapshot>, IngestError>;
}

/// Focused role trait for providers that serve news articles.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Fetch news articles published in the requested range.
    async fn news(&self, symbol: &str, params: &FetchParams)
    -> Result<Vec<NewsArticle>, IngestError>;
}

/// Focused role trait for providers that serve earnings events.
#[async_trait]
pub trait EarningsProvider: Send + Sync {
    /// Fetch recent and upcoming earnings events.
    async fn earnings(&self, symbol: &str) -> Result<Vec<EarningsEvent>, IngestError>;
}

/// Focused role trait for providers that serve industry peers.
#[async_trait]
pub trait PeersProvider: Send + Sync {
    /// Fetch peer links for the symbol.
    async fn peers(&self, symbol: &str) -> Result<Vec<PeerLink>, IngestError>;
}

/// Focused role trait for providers that serve macro-economic series.
#[async_trait]
pub trait MacroProvider: Send + Sync {
    /// Fetch observations of a series in the requested range.
    async fn macro_series(
        &self,
        series_id: &str,
        params: &FetchParams,
    ) -> Result<Vec<MacroObservation>, IngestError>;
}

/// Main provider trait implemented by adapters. Exposes capability discovery.
pub trait DataProvider: Send + Sync {
    /// A stable identifier used for priority configuration and row provenance.
    fn name(&self) -> &'static str;

    /// Canonical provider key constructed from the static name.
    fn key(&self) -> ProviderKey {
        ProviderKey::new(self.name())
    }

    /// Human-friendly vendor string.
    fn vendor(&self) -> &'static str {
        "unknown"
    }

    /// Advertise price capability by returning a usable trait object reference when supported.
    fn as_price_provider(&self) -> Option<&dyn PriceProvider> {
        None
    }
    /// If implemented, returns a trait object for fundamentals.
    fn as_fundamentals_provider(&self) -> Option<&dyn FundamentalsProvider> {
        None
    }
    /// If implemented, returns a trait object for news.
    fn as_news_provider(&self) -> Option<&dyn NewsProvider> {
        None
    }
    /// If implemented, returns a trait object for earnings.
    fn as_earnings_provider(&self) -> Option<&dyn EarningsProvider> {
        None
    }
    /// If implemented, returns a trait object for industry peers.
    fn as_peers_provider(&self) -> Option<&dyn PeersProvider> {
        None
    }
    /// If implemented, returns a trait object for macro series.
    fn as_macro_provider(&self) -> Option<&dyn MacroProvider> {
        None
    }

    /// Whether the role traits this provider exposes cover `data_type`.
    fn supports(&self, data_type: DataType) -> bool {
        match data_type {
            DataType::PriceHistorical => self.as_price_provider().is_some(),
            DataType::PriceIntraday => self
                .as_price_provider()
                .is_some_and(|p| p.supports_intraday()),
            DataType::Fundamentals => self.as_fundamentals_provider().is_some(),
            DataType::News => self.as_news_provider().is_some(),
            DataType::Earnings => self.as_earnings_provider().is_some(),
            DataType::IndustryPeers => self.as_peers_provider().is_some(),
            DataType::Macro => self.as_macro_provider().is_some(),
            DataType::TechnicalIndicators => false,
        }
    }
}

/// Call the role trait that serves `data_type` and wrap the rows in a [`Payload`].
///
/// # Errors
/// Returns `Unsupported` when the provider lacks the role, otherwise whatever
/// the role method returns.
pub async fn fetch_payload(
    provider: &dyn DataProvider,
    data_type: DataType,
    symbol: &str,
    params: &FetchParams,
) -> Result<Payload, IngestError> {
    let unsupported = || IngestError::unsupported(format!("{data_type} via {}", provider.name()));
    match data_type {
        DataType::PriceHistorical => {
            let p = provider.as_price_provider().ok_or_else(unsupported)?;
            p.historical_prices(symbol, params).await.map(Payload::Prices)
        }
        DataType::PriceIntraday => {
            let p = provider
                .as_price_provider()
                .filter(|p| p.supports_intraday())
                .ok_or_else(unsupported)?;
            p.intraday_prices(symbol, params).await.map(Payload::Prices)
        }
        DataType::Fundamentals => {
            let p = provider.as_fundamentals_provider().ok_or_else(unsupported)?;
            p.fundamentals(symbol).await.map(Payload::Fundamentals)
        }
        DataType::News => {
            let p = provider.as_news_provider().ok_or_else(unsupported)?;
            p.news(symbol, params).await.map(Payload::News)
        }
        DataType::Earnings => {
            let p = provider.as_earnings_provider().ok_or_else(unsupported)?;
            p.earnings(symbol).await.map(Payload::Earnings)
        }
        DataType::IndustryPeers => {
            let p = provider.as_peers_provider().ok_or_else(unsupported)?;
            p.peers(symbol).await.map(Payload::Peers)
        }
        DataType::Macro => {
            let p = provider.as_macro_provider().ok_or_else(unsupported)?;
            p.macro_series(symbol, params).await.map(Payload::Macro)
        }
        DataType::TechnicalIndicators => Err(unsupported()),
    }
}
