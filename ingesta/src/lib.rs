//! Ingesta keeps a market-data store fresh across several rate-limited providers.
//!
//! Overview
//! - Routes every fetch through a [`ProviderRegistry`] that tries providers in
//!   priority order and falls back on failure.
//! - Decides per (symbol, data type) whether stored data is stale using one
//!   [`RefreshStrategy`] per refresh mode.
//! - Validates fetched rows and persists them idempotently through a
//!   [`DataStore`] keyed by natural key.
//! - Gates each stage (ingestion, indicators, signals) and records terminal
//!   failures in a [`DeadLetterQueue`] for operator replay.
//!
//! Key behaviors and trade-offs
//! - Sequential fallback: deterministic provider order and a full diagnostic
//!   trail, at the cost of latency when early providers fail.
//! - Per-unit isolation: a failing (symbol, data type) never aborts the batch;
//!   every requested pair gets exactly one result.
//! - Retries: each unit runs under an explicit [`RetryPolicy`] with
//!   exponential backoff and jitter; non-retryable errors stop immediately.
//! - Cancellation and batch timeouts are cooperative: running units finish and
//!   units not yet started are reported as `Pending`.
//!
//! Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use ingesta::{DataRefreshManager, DataType, ProviderRegistry, RefreshMode};
//!
//! let registry = ProviderRegistry::builder()
//!     .with_configured_provider(Arc::new(my_provider), &config)
//!     .build()?;
//! let manager = DataRefreshManager::builder()
//!     .config(config)
//!     .registry(registry)
//!     .store(Arc::new(my_store))
//!     .build()?;
//! let batch = manager
//!     .refresh_batch(["AAPL", "MSFT"], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
//!     .await;
//! println!("{} of {} succeeded", batch.totals.successful, batch.totals.requested);
//! ```
//!
//! See `ingesta/examples/` for a runnable end-to-end demonstration.
#![warn(missing_docs)]

/// Dead-letter queue for terminal failures.
pub mod dead_letter;
/// Workflow gates between pipeline stages.
pub mod gates;
/// Batch orchestration.
pub mod manager;
/// Provider registry with priority fallback.
pub mod registry;
/// Idempotent row persistence.
pub mod saver;
/// Staleness strategies per refresh mode.
pub mod strategy;

pub use dead_letter::DeadLetterQueue;
pub use gates::{DataIngestionGate, GateRun, IndicatorComputationGate, SignalGenerationGate};
pub use manager::{CancelToken, DataRefreshManager, DataRefreshManagerBuilder};
pub use registry::{FallbackFetch, ProviderRegistry, ProviderRegistryBuilder};
pub use saver::{IdempotentDataSaver, UpsertReport};
pub use strategy::{RefreshStrategy, StalenessQuery, StrategySet};

pub use ingesta_middleware::{
    HealthTracker, ProviderClientBuilder, RateLimitedProviderClient, SlidingWindowLimiter,
};

// Re-export core types for convenience
pub use ingesta_core::{
    BarInterval, BatchResult, Clock, DataProvider, DataStore, DataType, DataTypeRefreshResult,
    DeadLetterEntry, DeadLetterFilter, FetchParams, GateConfig, GateResult, GateState,
    HealthConfig, IndicatorComputer, IndicatorError, IndicatorPoint, IndicatorSet, IngestError,
    IngestionRequirement, MarketCalendar, NaturalKey, Payload, PriceBar, ProviderHealth,
    ProviderRecord, ProviderSettings, RateLimitConfig, RefreshConfig, RefreshMode, RefreshRequest,
    RefreshStatus, RefreshTotals, RetryConfig, RetryPolicy, Stage, StoredRow, SymbolRefreshResult,
    SystemClock, UpsertOutcome,
};
