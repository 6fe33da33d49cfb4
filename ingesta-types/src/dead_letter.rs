//! Dead-letter records for units that failed terminally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data_type::{DataType, Stage};
use crate::error::IngestError;

/// Merge key of a dead-letter entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeadLetterKey {
    /// Symbol of the failed unit.
    pub symbol: String,
    /// Data type of the failed unit.
    pub data_type: DataType,
    /// Pipeline stage that failed.
    pub stage: Stage,
}

/// A terminal failure awaiting operator replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    /// Queue-assigned identifier; zero until enqueued.
    pub id: u64,
    /// Symbol of the failed unit.
    pub symbol: String,
    /// Data type of the failed unit.
    pub data_type: DataType,
    /// Pipeline stage that failed.
    pub stage: Stage,
    /// Display form of the most recent failure.
    pub failure_reason: String,
    /// Most recent failure.
    pub last_error: IngestError,
    /// Terminal failures recorded for this key.
    pub attempt_count: u32,
    /// First time this key was dead-lettered.
    pub first_seen: DateTime<Utc>,
    /// Most recent time this key was dead-lettered.
    pub last_seen: DateTime<Utc>,
    /// Times this entry has been turned back into a refresh request.
    pub requeue_count: u32,
}

impl DeadLetterEntry {
    /// A fresh entry for a terminal failure observed at `now`.
    pub fn new(
        symbol: impl Into<String>,
        data_type: DataType,
        stage: Stage,
        error: IngestError,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            symbol: symbol.into(),
            data_type,
            stage,
            failure_reason: error.to_string(),
            last_error: error,
            attempt_count: 1,
            first_seen: now,
            last_seen: now,
            requeue_count: 0,
        }
    }

    /// Merge key.
    #[must_use]
    pub fn key(&self) -> DeadLetterKey {
        DeadLetterKey {
            symbol: self.symbol.clone(),
            data_type: self.data_type,
            stage: self.stage,
        }
    }
}

/// Selection criteria for listing dead-letter entries. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterFilter {
    /// Only entries for this symbol.
    pub symbol: Option<String>,
    /// Only entries for this data type.
    pub data_type: Option<DataType>,
    /// Only entries for this stage.
    pub stage: Option<Stage>,
    /// Only entries with at least this many attempts.
    pub min_attempts: Option<u32>,
}

impl DeadLetterFilter {
    /// Restrict to a symbol.
    #[must_use]
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Restrict to a data type.
    #[must_use]
    pub const fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Restrict to a stage.
    #[must_use]
    pub const fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Restrict to entries with at least `n` attempts.
    #[must_use]
    pub const fn min_attempts(mut self, n: u32) -> Self {
        self.min_attempts = Some(n);
        self
    }

    /// Whether an entry satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &DeadLetterEntry) -> bool {
        self.symbol.as_deref().is_none_or(|s| s == entry.symbol)
            && self.data_type.is_none_or(|d| d == entry.data_type)
            && self.stage.is_none_or(|s| s == entry.stage)
            && self.min_attempts.is_none_or(|n| entry.attempt_count >= n)
    }
}
