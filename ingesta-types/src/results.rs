//! Refresh requests and their per-unit, per-symbol and per-batch results.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data_type::{DataType, RefreshMode};
use crate::error::IngestError;

/// Outcome of one (symbol, data type) unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefreshStatus {
    /// Data was fetched (or computed), validated and persisted.
    Success,
    /// The unit failed; see the attached error.
    Failed,
    /// Stored data was fresh enough; nothing was fetched.
    Skipped,
    /// The unit was never started because the batch was cancelled.
    Pending,
}

/// An immutable request to refresh some data types of one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Ticker or series identifier.
    pub symbol: String,
    /// Data types to refresh.
    pub data_types: BTreeSet<DataType>,
    /// Staleness strategy to apply.
    pub mode: RefreshMode,
    /// Refresh even if the stored data is fresh.
    pub force: bool,
}

impl RefreshRequest {
    /// Build a request for the given data types.
    pub fn new(
        symbol: impl Into<String>,
        data_types: impl IntoIterator<Item = DataType>,
        mode: RefreshMode,
        force: bool,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            data_types: data_types.into_iter().collect(),
            mode,
            force,
        }
    }
}

/// Result of refreshing one data type for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeRefreshResult {
    /// Data type this result is for.
    pub data_type: DataType,
    /// Final status.
    pub status: RefreshStatus,
    /// Short human-readable summary.
    pub message: String,
    /// Failure cause for `Failed` and `Pending` results.
    pub error: Option<IngestError>,
    /// Rows inserted or updated.
    pub rows_affected: usize,
    /// Provider that served the data, if any.
    pub provider: Option<String>,
    /// When the result was recorded.
    pub timestamp: DateTime<Utc>,
}

impl DataTypeRefreshResult {
    /// A successful refresh.
    pub fn success(
        data_type: DataType,
        rows_affected: usize,
        provider: Option<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            data_type,
            status: RefreshStatus::Success,
            message: message.into(),
            error: None,
            rows_affected,
            provider,
            timestamp,
        }
    }

    /// Stored data was fresh.
    #[must_use]
    pub fn skipped(data_type: DataType, timestamp: DateTime<Utc>) -> Self {
        Self {
            data_type,
            status: RefreshStatus::Skipped,
            message: "data is fresh".to_string(),
            error: None,
            rows_affected: 0,
            provider: None,
            timestamp,
        }
    }

    /// A failed unit.
    #[must_use]
    pub fn failed(data_type: DataType, error: IngestError, timestamp: DateTime<Utc>) -> Self {
        Self {
            data_type,
            status: RefreshStatus::Failed,
            message: error.to_string(),
            error: Some(error),
            rows_affected: 0,
            provider: None,
            timestamp,
        }
    }

    /// A unit that was not started before cancellation.
    #[must_use]
    pub fn pending(data_type: DataType, reason: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            data_type,
            status: RefreshStatus::Pending,
            message: "not started".to_string(),
            error: Some(IngestError::Cancelled(reason.to_string())),
            rows_affected: 0,
            provider: None,
            timestamp,
        }
    }

    /// Attach the serving provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

/// Per-status counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefreshTotals {
    /// Units requested.
    pub requested: usize,
    /// Units that succeeded.
    pub successful: usize,
    /// Units that failed.
    pub failed: usize,
    /// Units skipped as fresh.
    pub skipped: usize,
    /// Units not started.
    pub pending: usize,
}

impl RefreshTotals {
    /// Count one unit with the given status.
    pub const fn record(&mut self, status: RefreshStatus) {
        self.requested += 1;
        match status {
            RefreshStatus::Success => self.successful += 1,
            RefreshStatus::Failed => self.failed += 1,
            RefreshStatus::Skipped => self.skipped += 1,
            RefreshStatus::Pending => self.pending += 1,
        }
    }

    /// Add another set of counters into this one.
    pub const fn absorb(&mut self, other: &Self) {
        self.requested += other.requested;
        self.successful += other.successful;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.pending += other.pending;
    }
}

/// Results for every requested data type of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRefreshResult {
    /// Symbol these results are for.
    pub symbol: String,
    /// One result per requested data type.
    pub results: BTreeMap<DataType, DataTypeRefreshResult>,
    /// Counters derived from `results`.
    pub totals: RefreshTotals,
}

impl SymbolRefreshResult {
    /// Empty result set for a symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            results: BTreeMap::new(),
            totals: RefreshTotals::default(),
        }
    }

    /// Record a unit result, replacing any earlier one for the same data type.
    pub fn record(&mut self, result: DataTypeRefreshResult) {
        self.results.insert(result.data_type, result);
        self.recount();
    }

    /// Result for a data type.
    #[must_use]
    pub fn get(&self, data_type: DataType) -> Option<&DataTypeRefreshResult> {
        self.results.get(&data_type)
    }

    /// Status for a data type.
    #[must_use]
    pub fn status(&self, data_type: DataType) -> Option<RefreshStatus> {
        self.get(data_type).map(|r| r.status)
    }

    /// True when no unit failed or was left pending.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.totals.failed == 0 && self.totals.pending == 0
    }

    fn recount(&mut self) {
        let mut totals = RefreshTotals::default();
        for r in self.results.values() {
            totals.record(r.status);
        }
        self.totals = totals;
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Per-symbol results in input order, duplicates collapsed.
    pub symbols: Vec<SymbolRefreshResult>,
    /// Totals across all symbols.
    pub totals: RefreshTotals,
    /// Dead-letter entries created or merged during this batch.
    pub dead_lettered: usize,
    /// Whether the batch was cancelled (token or timeout) before all units started.
    pub cancelled: bool,
    /// Batch start time.
    pub started_at: DateTime<Utc>,
    /// Batch end time.
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    /// Assemble a batch result, computing totals from the symbol results.
    #[must_use]
    pub fn new(
        symbols: Vec<SymbolRefreshResult>,
        dead_lettered: usize,
        cancelled: bool,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let mut totals = RefreshTotals::default();
        for s in &symbols {
            totals.absorb(&s.totals);
        }
        Self {
            symbols,
            totals,
            dead_lettered,
            cancelled,
            started_at,
            finished_at,
        }
    }

    /// Results for a symbol.
    #[must_use]
    pub fn symbol(&self, symbol: &str) -> Option<&SymbolRefreshResult> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }

    /// Result for a single (symbol, data type) unit.
    #[must_use]
    pub fn result(&self, symbol: &str, data_type: DataType) -> Option<&DataTypeRefreshResult> {
        self.symbol(symbol).and_then(|s| s.get(data_type))
    }
}
