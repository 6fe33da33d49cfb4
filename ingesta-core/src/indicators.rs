//! Seam to the external indicator computation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payload::{NaturalKey, PriceBar, StoredRow};
use crate::{DataType, IngestError};

/// Failure reported by an [`IndicatorComputer`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum IndicatorError {
    /// Not enough bars for the longest lookback.
    #[error("insufficient data: need {needed} bars, have {available}")]
    InsufficientData {
        /// Bars required.
        needed: usize,
        /// Bars supplied.
        available: usize,
    },
    /// The input or output violated the computation contract.
    #[error("malformed indicator input: {0}")]
    Malformed(String),
}

/// Indicator values at one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    /// Bar timestamp.
    pub ts: DateTime<Utc>,
    /// Indicator values by name; `None` while an indicator is warming up.
    pub values: BTreeMap<String, Option<f64>>,
}

impl IndicatorPoint {
    /// Whether every value is present and finite.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.values.values().all(|v| v.is_some_and(f64::is_finite))
    }
}

/// Indicator series for one symbol, oldest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Points in ascending time order.
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSet {
    /// The most recent point.
    #[must_use]
    pub fn latest(&self) -> Option<&IndicatorPoint> {
        self.points.last()
    }

    /// Number of points with every value present and finite.
    #[must_use]
    pub fn complete_points(&self) -> usize {
        self.points.iter().filter(|p| p.is_complete()).count()
    }

    /// Persistable rows keyed by `(symbol, ts, source)`.
    ///
    /// # Errors
    /// Returns `Storage` if a point cannot be serialized.
    pub fn to_rows(&self, symbol: &str, source: &str) -> Result<Vec<StoredRow>, IngestError> {
        self.points
            .iter()
            .map(|p| {
                let body = serde_json::to_value(p).map_err(|e| {
                    IngestError::Storage(format!("serialize indicator point: {e}"))
                })?;
                Ok(StoredRow {
                    data_type: DataType::TechnicalIndicators,
                    key: NaturalKey {
                        symbol: symbol.to_string(),
                        ts: p.ts,
                        source: source.to_string(),
                        discriminator: String::new(),
                    },
                    body,
                })
            })
            .collect()
    }
}

/// Pure indicator computation over daily bars.
pub trait IndicatorComputer: Send + Sync {
    /// Name recorded as the source of persisted indicator rows.
    fn name(&self) -> &'static str;

    /// Compute indicators over `bars` (ascending by time).
    ///
    /// # Errors
    /// `InsufficientData` when the history is too short; `Malformed` when
    /// the bars cannot be used.
    fn compute(&self, symbol: &str, bars: &[PriceBar]) -> Result<IndicatorSet, IndicatorError>;
}
