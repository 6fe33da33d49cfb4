use std::collections::HashMap;
use std::sync::Arc;

use ingesta_core::{DataStore, DataType, IngestError, NaturalKey, StoredRow, UpsertOutcome};

/// Per-batch outcome of [`IdempotentDataSaver::upsert`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertReport {
    /// Rows that did not exist before.
    pub inserted: usize,
    /// Rows whose content changed.
    pub updated: usize,
    /// Rows already stored with identical content.
    pub unchanged: usize,
    /// Rows that could not be written, with the reason.
    pub failed: Vec<(NaturalKey, IngestError)>,
}

impl UpsertReport {
    /// Rows inserted or updated.
    #[must_use]
    pub const fn rows_affected(&self) -> usize {
        self.inserted + self.updated
    }

    /// Distinct rows submitted.
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.inserted + self.updated + self.unchanged + self.failed.len()
    }
}

/// Writes rows through a [`DataStore`] so that re-delivery is a no-op.
///
/// Each row is its own write; one failing row never prevents the others from
/// committing.
#[derive(Clone)]
pub struct IdempotentDataSaver {
    store: Arc<dyn DataStore>,
}

impl IdempotentDataSaver {
    /// Saver over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Upsert `rows` into the `data_type` table.
    ///
    /// Rows sharing a natural key collapse to the last occurrence before
    /// writing. Rows of another data type are reported as failed.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "ingesta::saver::upsert",
            skip(self, rows),
            fields(data_type = %data_type, rows = rows.len()),
        )
    )]
    pub async fn upsert(&self, data_type: DataType, rows: Vec<StoredRow>) -> UpsertReport {
        let mut report = UpsertReport::default();

        let mut position: HashMap<NaturalKey, usize> = HashMap::with_capacity(rows.len());
        let mut unique: Vec<StoredRow> = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(&i) = position.get(&row.key) {
                unique[i] = row;
            } else {
                position.insert(row.key.clone(), unique.len());
                unique.push(row);
            }
        }

        for row in &unique {
            if row.data_type != data_type {
                report.failed.push((
                    row.key.clone(),
                    IngestError::InvalidArg(format!(
                        "{} row submitted to {data_type} table",
                        row.data_type
                    )),
                ));
                continue;
            }
            match self.store.upsert_row(row).await {
                Ok(UpsertOutcome::Inserted) => report.inserted += 1,
                Ok(UpsertOutcome::Updated) => report.updated += 1,
                Ok(UpsertOutcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(symbol = %row.key.symbol, ts = %row.key.ts, error = %e, "row upsert failed");
                    report.failed.push((row.key.clone(), e));
                }
            }
        }
        report
    }
}
