use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use ingesta_core::{DataStore, DataType, IngestError, NaturalKey, StoredRow, UpsertOutcome};

#[derive(Default)]
struct StoreState {
    tables: HashMap<DataType, BTreeMap<NaturalKey, serde_json::Value>>,
    refreshed: HashMap<(String, DataType), DateTime<Utc>>,
    failing_rows: HashSet<(DataType, String, DateTime<Utc>)>,
    failing_types: HashSet<DataType>,
    writes: usize,
}

/// In-memory [`DataStore`] with failure injection.
///
/// Rows live in one ordered map per data type keyed by [`NaturalKey`]. An
/// upsert whose body equals the stored body is `Unchanged` and does not count
/// as a write.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `(symbol, data_type)` was refreshed at `at`.
    pub async fn set_last_updated(&self, symbol: &str, data_type: DataType, at: DateTime<Utc>) {
        self.state
            .lock()
            .await
            .refreshed
            .insert((symbol.to_string(), data_type), at);
    }

    /// Make upserts of the row keyed `(symbol, ts)` in `data_type` fail.
    pub async fn fail_row(&self, data_type: DataType, symbol: &str, ts: DateTime<Utc>) {
        self.state
            .lock()
            .await
            .failing_rows
            .insert((data_type, symbol.to_string(), ts));
    }

    /// Make every upsert into `data_type` fail.
    pub async fn fail_table(&self, data_type: DataType) {
        self.state.lock().await.failing_types.insert(data_type);
    }

    /// Stop injecting failures.
    pub async fn heal(&self) {
        let mut guard = self.state.lock().await;
        guard.failing_rows.clear();
        guard.failing_types.clear();
    }

    /// Insert rows directly, bypassing failure injection.
    pub async fn seed(&self, rows: impl IntoIterator<Item = StoredRow>) {
        let mut guard = self.state.lock().await;
        for row in rows {
            guard
                .tables
                .entry(row.data_type)
                .or_default()
                .insert(row.key, row.body);
        }
    }

    /// Number of rows stored for `data_type` across all symbols.
    pub async fn table_len(&self, data_type: DataType) -> usize {
        self.state
            .lock()
            .await
            .tables
            .get(&data_type)
            .map_or(0, BTreeMap::len)
    }

    /// Inserts plus updates performed through `upsert_row`.
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn last_updated(
        &self,
        symbol: &str,
        data_type: DataType,
    ) -> Result<Option<DateTime<Utc>>, IngestError> {
        Ok(self
            .state
            .lock()
            .await
            .refreshed
            .get(&(symbol.to_string(), data_type))
            .copied())
    }

    async fn mark_refreshed(
        &self,
        symbol: &str,
        data_type: DataType,
        at: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        self.state
            .lock()
            .await
            .refreshed
            .insert((symbol.to_string(), data_type), at);
        Ok(())
    }

    async fn upsert_row(&self, row: &StoredRow) -> Result<UpsertOutcome, IngestError> {
        let mut guard = self.state.lock().await;
        if guard.failing_types.contains(&row.data_type)
            || guard
                .failing_rows
                .contains(&(row.data_type, row.key.symbol.clone(), row.key.ts))
        {
            return Err(IngestError::Storage(format!(
                "injected write failure for {} {}@{}",
                row.data_type, row.key.symbol, row.key.ts
            )));
        }
        let table = guard.tables.entry(row.data_type).or_default();
        let outcome = match table.get(&row.key) {
            None => UpsertOutcome::Inserted,
            Some(existing) if *existing == row.body => return Ok(UpsertOutcome::Unchanged),
            Some(_) => UpsertOutcome::Updated,
        };
        table.insert(row.key.clone(), row.body.clone());
        guard.writes += 1;
        Ok(outcome)
    }

    async fn rows(
        &self,
        data_type: DataType,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredRow>, IngestError> {
        let guard = self.state.lock().await;
        let Some(table) = guard.tables.get(&data_type) else {
            return Ok(Vec::new());
        };
        Ok(table
            .iter()
            .filter(|(k, _)| {
                k.symbol == symbol
                    && start.is_none_or(|s| k.ts >= s)
                    && end.is_none_or(|e| k.ts < e)
            })
            .map(|(k, body)| StoredRow {
                data_type,
                key: k.clone(),
                body: body.clone(),
            })
            .collect())
    }
}
