use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use ingesta_core::connector::{
    DataProvider, EarningsProvider, FetchParams, FundamentalsProvider, MacroProvider,
    NewsProvider, PeersProvider, PriceProvider,
};
use ingesta_core::{
    DataType, EarningsEvent, FundamentalsSnapshot, IngestError, MacroObservation, NewsArticle,
    Payload, PeerLink, PriceBar,
};

/// Instruction for how a fetch should behave for a given `(data type, symbol)`.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Sleep for the duration, then return the value.
    Delay(Duration, T),
    /// Fail immediately with the provided error.
    Fail(IngestError),
    /// Hang indefinitely (simulate a timeout).
    Hang,
}

/// One observed call into the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Data type requested.
    pub data_type: DataType,
    /// Symbol (or series id) requested.
    pub symbol: String,
    /// Parameters passed by the caller.
    pub params: FetchParams,
    /// When the call arrived, on the Tokio clock.
    pub at: Instant,
}

#[derive(Default)]
struct InternalState {
    // Front behavior is consumed per call while more than one is queued; the
    // last one sticks.
    rules: HashMap<(DataType, String), VecDeque<MockBehavior<Payload>>>,
    calls: Vec<MockCall>,
}

impl InternalState {
    fn next_behavior(&mut self, data_type: DataType, symbol: &str) -> Option<MockBehavior<Payload>> {
        let queue = self.rules.get_mut(&(data_type, symbol.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
#[derive(Clone)]
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Replace every queued behavior for `(data_type, symbol)` with `behavior`.
    pub async fn set_behavior(
        &self,
        data_type: DataType,
        symbol: &str,
        behavior: MockBehavior<Payload>,
    ) {
        let mut guard = self.state.lock().await;
        guard
            .rules
            .insert((data_type, symbol.to_string()), VecDeque::from([behavior]));
    }

    /// Queue `behavior` after the ones already set for `(data_type, symbol)`.
    ///
    /// Queued behaviors are used once each, in order; the last one repeats.
    pub async fn push_behavior(
        &self,
        data_type: DataType,
        symbol: &str,
        behavior: MockBehavior<Payload>,
    ) {
        let mut guard = self.state.lock().await;
        guard
            .rules
            .entry((data_type, symbol.to_string()))
            .or_default()
            .push_back(behavior);
    }

    /// Shorthand for `set_behavior(.., MockBehavior::Return(payload))`.
    pub async fn returns(&self, data_type: DataType, symbol: &str, payload: Payload) {
        self.set_behavior(data_type, symbol, MockBehavior::Return(payload))
            .await;
    }

    /// Shorthand for `set_behavior(.., MockBehavior::Fail(err))`.
    pub async fn fails(&self, data_type: DataType, symbol: &str, err: IngestError) {
        self.set_behavior(data_type, symbol, MockBehavior::Fail(err))
            .await;
    }

    /// Every call observed so far, oldest first.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls for `(data_type, symbol)`.
    pub async fn call_count(&self, data_type: DataType, symbol: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.data_type == data_type && c.symbol == symbol)
            .count()
    }

    /// Total number of calls.
    pub async fn total_calls(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    /// Forget recorded calls; behaviors are kept.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }
}

/// A provider whose responses are scripted at runtime through a
/// [`DynamicMockController`].
///
/// Range-bearing payloads (prices, news, macro) are filtered to the requested
/// `[start, end)` window before being returned. A call with no configured
/// behavior fails with `NotFound`.
pub struct DynamicMockProvider {
    name: &'static str,
    supported: BTreeSet<DataType>,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockProvider {
    /// Create a provider serving every fetchable data type.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn DataProvider>, DynamicMockController) {
        Self::with_types(name, DataType::ALL.iter().copied().filter(|d| d.is_fetched()))
    }

    /// Create a provider serving only `data_types`.
    #[must_use]
    pub fn with_types(
        name: &'static str,
        data_types: impl IntoIterator<Item = DataType>,
    ) -> (Arc<dyn DataProvider>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let provider = Arc::new(Self {
            name,
            supported: data_types.into_iter().filter(|d| d.is_fetched()).collect(),
            state: Arc::clone(&state),
        });
        (provider, DynamicMockController { state })
    }

    async fn respond(
        &self,
        data_type: DataType,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Payload, IngestError> {
        // Snapshot the behavior without holding the lock across await.
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.calls.push(MockCall {
                data_type,
                symbol: symbol.to_string(),
                params: params.clone(),
                at: Instant::now(),
            });
            guard.next_behavior(data_type, symbol)
        };
        match behavior {
            Some(MockBehavior::Return(p)) => Ok(filter_range(p, params)),
            Some(MockBehavior::Delay(d, p)) => {
                tokio::time::sleep(d).await;
                Ok(filter_range(p, params))
            }
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => std::future::pending().await,
            None => Err(IngestError::not_found(format!(
                "{data_type} for {symbol} at {}",
                self.name
            ))),
        }
    }

    fn mismatch(&self, data_type: DataType) -> IngestError {
        IngestError::parse(self.name, format!("scripted payload does not fit {data_type}"))
    }
}

fn filter_range(payload: Payload, params: &FetchParams) -> Payload {
    match payload {
        Payload::Prices(v) => Payload::Prices(v.into_iter().filter(|b| params.contains(b.ts)).collect()),
        Payload::News(v) => Payload::News(
            v.into_iter()
                .filter(|a| params.contains(a.published_at))
                .collect(),
        ),
        Payload::Macro(v) => Payload::Macro(v.into_iter().filter(|o| params.contains(o.ts)).collect()),
        other => other,
    }
}

impl DataProvider for DynamicMockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "Mock"
    }

    fn as_price_provider(&self) -> Option<&dyn PriceProvider> {
        (self.supported.contains(&DataType::PriceHistorical)
            || self.supported.contains(&DataType::PriceIntraday))
        .then_some(self as &dyn PriceProvider)
    }

    fn as_fundamentals_provider(&self) -> Option<&dyn FundamentalsProvider> {
        self.supported
            .contains(&DataType::Fundamentals)
            .then_some(self as &dyn FundamentalsProvider)
    }

    fn as_news_provider(&self) -> Option<&dyn NewsProvider> {
        self.supported
            .contains(&DataType::News)
            .then_some(self as &dyn NewsProvider)
    }

    fn as_earnings_provider(&self) -> Option<&dyn EarningsProvider> {
        self.supported
            .contains(&DataType::Earnings)
            .then_some(self as &dyn EarningsProvider)
    }

    fn as_peers_provider(&self) -> Option<&dyn PeersProvider> {
        self.supported
            .contains(&DataType::IndustryPeers)
            .then_some(self as &dyn PeersProvider)
    }

    fn as_macro_provider(&self) -> Option<&dyn MacroProvider> {
        self.supported
            .contains(&DataType::Macro)
            .then_some(self as &dyn MacroProvider)
    }

    fn supports(&self, data_type: DataType) -> bool {
        self.supported.contains(&data_type)
    }
}

#[async_trait]
impl PriceProvider for DynamicMockProvider {
    async fn historical_prices(
        &self,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Vec<PriceBar>, IngestError> {
        if !self.supported.contains(&DataType::PriceHistorical) {
            return Err(IngestError::unsupported(DataType::PriceHistorical.as_str()));
        }
        match self.respond(DataType::PriceHistorical, symbol, params).await? {
            Payload::Prices(v) => Ok(v),
            _ => Err(self.mismatch(DataType::PriceHistorical)),
        }
    }

    async fn intraday_prices(
        &self,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Vec<PriceBar>, IngestError> {
        match self.respond(DataType::PriceIntraday, symbol, params).await? {
            Payload::Prices(v) => Ok(v),
            _ => Err(self.mismatch(DataType::PriceIntraday)),
        }
    }

    fn supports_intraday(&self) -> bool {
        self.supported.contains(&DataType::PriceIntraday)
    }
}

#[async_trait]
impl FundamentalsProvider for DynamicMockProvider {
    async fn fundamentals(&self, symbol: &str) -> Result<Vec<FundamentalsSnapshot>, IngestError> {
        match self
            .respond(DataType::Fundamentals, symbol, &FetchParams::default())
            .await?
        {
            Payload::Fundamentals(v) => Ok(v),
            _ => Err(self.mismatch(DataType::Fundamentals)),
        }
    }
}

#[async_trait]
impl NewsProvider for DynamicMockProvider {
    async fn news(
        &self,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Vec<NewsArticle>, IngestError> {
        match self.respond(DataType::News, symbol, params).await? {
            Payload::News(mut v) => {
                if let Some(limit) = params.limit {
                    v.truncate(limit);
                }
                Ok(v)
            }
            _ => Err(self.mismatch(DataType::News)),
        }
    }
}

#[async_trait]
impl EarningsProvider for DynamicMockProvider {
    async fn earnings(&self, symbol: &str) -> Result<Vec<EarningsEvent>, IngestError> {
        match self
            .respond(DataType::Earnings, symbol, &FetchParams::default())
            .await?
        {
            Payload::Earnings(v) => Ok(v),
            _ => Err(self.mismatch(DataType::Earnings)),
        }
    }
}

#[async_trait]
impl PeersProvider for DynamicMockProvider {
    async fn peers(&self, symbol: &str) -> Result<Vec<PeerLink>, IngestError> {
        match self
            .respond(DataType::IndustryPeers, symbol, &FetchParams::default())
            .await?
        {
            Payload::Peers(v) => Ok(v),
            _ => Err(self.mismatch(DataType::IndustryPeers)),
        }
    }
}

#[async_trait]
impl MacroProvider for DynamicMockProvider {
    async fn macro_series(
        &self,
        series_id: &str,
        params: &FetchParams,
    ) -> Result<Vec<MacroObservation>, IngestError> {
        match self.respond(DataType::Macro, series_id, params).await? {
            Payload::Macro(v) => Ok(v),
            _ => Err(self.mismatch(DataType::Macro)),
        }
    }
}
