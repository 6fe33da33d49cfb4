//! Persistence seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::payload::StoredRow;
use crate::{DataType, IngestError};

/// What a single-row upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpsertOutcome {
    /// No row with the natural key existed.
    Inserted,
    /// A row existed with a different body and was replaced.
    Updated,
    /// A row existed with an identical body; nothing was written.
    Unchanged,
}

/// Row store for every data type table plus the refresh log.
///
/// Each `upsert_row` is its own transaction; nothing spans rows.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// When `(symbol, data_type)` was last refreshed successfully, if ever.
    async fn last_updated(
        &self,
        symbol: &str,
        data_type: DataType,
    ) -> Result<Option<DateTime<Utc>>, IngestError>;

    /// Record a successful refresh of `(symbol, data_type)` at `at`.
    async fn mark_refreshed(
        &self,
        symbol: &str,
        data_type: DataType,
        at: DateTime<Utc>,
    ) -> Result<(), IngestError>;

    /// Insert the row, replace it if its body changed, or leave it alone.
    async fn upsert_row(&self, row: &StoredRow) -> Result<UpsertOutcome, IngestError>;

    /// Rows for a symbol with `start <= ts < end`; open bounds match everything.
    async fn rows(
        &self,
        data_type: DataType,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredRow>, IngestError>;

    /// Number of rows `rows` would return.
    async fn count_rows(
        &self,
        data_type: DataType,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<usize, IngestError> {
        Ok(self.rows(data_type, symbol, start, end).await?.len())
    }
}
