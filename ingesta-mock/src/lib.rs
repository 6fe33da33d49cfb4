//! Deterministic fakes for exercising ingesta without network or database.
//!
//! - [`MockProvider`]: fixture-backed provider for demos and CI.
//! - [`DynamicMockProvider`]: provider scripted at runtime through a controller.
//! - [`MemoryStore`]: in-memory `DataStore` with failure injection.
//! - [`SmaIndicators`] / [`ScriptedIndicators`]: indicator computers.
//! - [`ManualClock`]: a clock tests move by hand.
use async_trait::async_trait;
use ingesta_core::connector::{
    DataProvider, EarningsProvider, FetchParams, FundamentalsProvider, MacroProvider,
    NewsProvider, PeersProvider, PriceProvider,
};
use ingesta_core::{
    EarningsEvent, FundamentalsSnapshot, IngestError, MacroObservation, NewsArticle, PeerLink,
    PriceBar,
};

mod clock;
mod dynamic;
pub mod fixtures;
mod indicators;
mod store;

pub use clock::ManualClock;
pub use dynamic::{DynamicMockController, DynamicMockProvider, MockBehavior, MockCall};
pub use indicators::{ScriptedIndicators, SmaIndicators};
pub use store::MemoryStore;

/// Mock provider for CI-safe demos. Serves deterministic data from fixtures.
///
/// Known symbols are `AAPL` and `MSFT`. The symbol `FAIL` fails every call
/// with a transient request error; `TIMEOUT` sleeps 200 ms before answering.
pub struct MockProvider;

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Stateless constructor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn not_found(what: &str) -> IngestError {
        IngestError::not_found(what.to_string())
    }

    async fn maybe_fail_or_timeout(symbol: &str, capability: &'static str) -> Result<(), IngestError> {
        match symbol {
            "FAIL" => Err(IngestError::request(
                "ingesta-mock",
                format!("forced failure: {capability}"),
            )),
            "TIMEOUT" => {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn known(symbol: &str) -> bool {
        matches!(symbol, "AAPL" | "MSFT" | "TIMEOUT")
    }
}

impl DataProvider for MockProvider {
    fn name(&self) -> &'static str {
        "ingesta-mock"
    }
    fn vendor(&self) -> &'static str {
        "Mock"
    }

    fn as_price_provider(&self) -> Option<&dyn PriceProvider> {
        Some(self as &dyn PriceProvider)
    }
    fn as_fundamentals_provider(&self) -> Option<&dyn FundamentalsProvider> {
        Some(self as &dyn FundamentalsProvider)
    }
    fn as_news_provider(&self) -> Option<&dyn NewsProvider> {
        Some(self as &dyn NewsProvider)
    }
    fn as_earnings_provider(&self) -> Option<&dyn EarningsProvider> {
        Some(self as &dyn EarningsProvider)
    }
    fn as_peers_provider(&self) -> Option<&dyn PeersProvider> {
        Some(self as &dyn PeersProvider)
    }
    fn as_macro_provider(&self) -> Option<&dyn MacroProvider> {
        Some(self as &dyn MacroProvider)
    }
}

#[async_trait]
impl PriceProvider for MockProvider {
    async fn historical_prices(
        &self,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Vec<PriceBar>, IngestError> {
        Self::maybe_fail_or_timeout(symbol, "price-historical").await?;
        if !Self::known(symbol) {
            return Err(Self::not_found(&format!("history for {symbol}")));
        }
        Ok(fixtures::daily_bars(symbol, "2025-01-02", 60)
            .into_iter()
            .filter(|b| params.contains(b.ts))
            .collect())
    }
}

#[async_trait]
impl FundamentalsProvider for MockProvider {
    async fn fundamentals(&self, symbol: &str) -> Result<Vec<FundamentalsSnapshot>, IngestError> {
        Self::maybe_fail_or_timeout(symbol, "fundamentals").await?;
        if !Self::known(symbol) {
            return Err(Self::not_found(&format!("fundamentals for {symbol}")));
        }
        Ok(vec![fixtures::fundamentals(symbol, "2025-03-31")])
    }
}

#[async_trait]
impl NewsProvider for MockProvider {
    async fn news(
        &self,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Vec<NewsArticle>, IngestError> {
        Self::maybe_fail_or_timeout(symbol, "news").await?;
        let mut out: Vec<NewsArticle> = fixtures::news(symbol, fixtures::day("2025-03-20"), 5)
            .into_iter()
            .filter(|a| params.contains(a.published_at))
            .collect();
        if let Some(limit) = params.limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}

#[async_trait]
impl EarningsProvider for MockProvider {
    async fn earnings(&self, symbol: &str) -> Result<Vec<EarningsEvent>, IngestError> {
        Self::maybe_fail_or_timeout(symbol, "earnings").await?;
        Ok(vec![fixtures::earnings(symbol, "2025-01-30", "2025Q1")])
    }
}

#[async_trait]
impl PeersProvider for MockProvider {
    async fn peers(&self, symbol: &str) -> Result<Vec<PeerLink>, IngestError> {
        Self::maybe_fail_or_timeout(symbol, "industry-peers").await?;
        let others: Vec<&str> = ["AAPL", "MSFT", "GOOGL"]
            .into_iter()
            .filter(|p| *p != symbol)
            .collect();
        Ok(fixtures::peers(symbol, "2025-03-01", &others))
    }
}

#[async_trait]
impl MacroProvider for MockProvider {
    async fn macro_series(
        &self,
        series_id: &str,
        params: &FetchParams,
    ) -> Result<Vec<MacroObservation>, IngestError> {
        Self::maybe_fail_or_timeout(series_id, "macro").await?;
        Ok(fixtures::macro_series(series_id, "2024-01-01", 12)
            .into_iter()
            .filter(|o| params.contains(o.ts))
            .collect())
    }
}
