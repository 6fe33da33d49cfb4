// Shared fixtures for the orchestrator tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ingesta::{
    DataProvider, DataRefreshManager, IndicatorComputer, Payload, ProviderClientBuilder,
    ProviderRegistry, RateLimitedProviderClient, RefreshConfig,
};
use ingesta_mock::{ManualClock, MemoryStore, fixtures};

/// Common symbol constants used across tests.
pub const AAPL: &str = "AAPL";
pub const MSFT: &str = "MSFT";
pub const TSLA: &str = "TSLA";

/// Fixed wall clock for every scenario: Tuesday 2025-04-01 12:00 UTC.
pub fn now() -> DateTime<Utc> {
    fixtures::day("2025-04-01") + chrono::Duration::hours(12)
}

/// Default configuration with short, jitter-free retries.
pub fn test_config() -> RefreshConfig {
    RefreshConfig {
        data_fetch_retry_attempts: 3,
        data_fetch_retry_delay: Duration::from_millis(10),
        retry_max_delay: Duration::from_millis(100),
        retry_jitter_fraction: 0.0,
        ..RefreshConfig::default()
    }
}

/// Client without its own retries so provider call counts stay exact.
pub fn client(raw: Arc<dyn DataProvider>, priority: u32) -> Arc<RateLimitedProviderClient> {
    ProviderClientBuilder::new(raw)
        .priority(priority)
        .no_retry()
        .build()
}

/// `n` weekday bars for `symbol` starting 2025-01-02.
pub fn prices(symbol: &str, n: usize) -> Payload {
    Payload::Prices(fixtures::daily_bars(symbol, "2025-01-02", n))
}

pub struct Harness {
    pub manager: DataRefreshManager,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(clients: Vec<Arc<RateLimitedProviderClient>>) -> Harness {
    harness_with(clients, test_config(), None)
}

pub fn harness_with(
    clients: Vec<Arc<RateLimitedProviderClient>>,
    cfg: RefreshConfig,
    indicators: Option<Arc<dyn IndicatorComputer>>,
) -> Harness {
    let registry = clients
        .into_iter()
        .fold(ProviderRegistry::builder(), |b, c| b.with_client(c))
        .build()
        .expect("registry");
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(now()));
    let mut builder = DataRefreshManager::builder()
        .config(cfg)
        .registry(registry)
        .store(store.clone())
        .clock(clock.clone());
    if let Some(computer) = indicators {
        builder = builder.indicators(computer);
    }
    Harness {
        manager: builder.build().expect("manager"),
        store,
        clock,
    }
}
