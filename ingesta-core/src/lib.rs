//! ingesta-core
//!
//! Core traits and utilities shared across the ingesta workspace.
//!
//! - `connector`: the `DataProvider` trait and its focused role traits.
//! - `payload`: typed provider rows, natural keys and the persistable row form.
//! - `validate`: per-row validation between fetch and persistence.
//! - `retry`: the explicit `RetryPolicy` used by clients and the orchestrator.
//! - `store`, `indicators`, `clock`: seams to persistence, indicator
//!   computation and wall-clock time.
//! - `calendar`: trading days and the daily scheduled-refresh boundary.
//!
//! Async runtime (Tokio)
//! ---------------------
//! Retry backoff sleeps with `tokio::time::sleep`; callers must run under a
//! Tokio 1.x runtime with the time driver enabled.
#![warn(missing_docs)]

/// Market calendar used by scheduled refreshes.
pub mod calendar;
/// Wall-clock seam.
pub mod clock;
/// Provider capability traits and the primary `DataProvider` interface.
pub mod connector;
/// Indicator computation seam.
pub mod indicators;
/// Typed rows and their persistable form.
pub mod payload;
/// Retry with exponential backoff and jitter.
pub mod retry;
/// Persistence seam.
pub mod store;
/// Row validation.
pub mod validate;

pub use calendar::MarketCalendar;
pub use clock::{Clock, SystemClock};
pub use connector::{
    BarInterval, DataProvider, EarningsProvider, FetchParams, FundamentalsProvider, MacroProvider,
    NewsProvider, PeersProvider, PriceProvider, fetch_payload,
};
pub use indicators::{IndicatorComputer, IndicatorError, IndicatorPoint, IndicatorSet};
pub use payload::{
    EarningsEvent, FundamentalsSnapshot, MacroObservation, NaturalKey, NewsArticle, Payload,
    PeerLink, PriceBar, Row, StoredRow,
};
pub use retry::{RetryError, RetryPolicy};
pub use store::{DataStore, UpsertOutcome};
pub use validate::{ValidationReport, validate_payload};

// Consolidated re-exports so downstream crates can depend on `ingesta-core` only
pub use ingesta_types::*;
pub use rust_decimal::Decimal;
