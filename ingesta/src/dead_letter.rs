use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use ingesta_core::{
    DeadLetterEntry, DeadLetterFilter, DeadLetterKey, IngestError, RefreshMode, RefreshRequest,
};

#[derive(Debug, Default)]
struct QueueState {
    entries: BTreeMap<u64, DeadLetterEntry>,
    by_key: HashMap<DeadLetterKey, u64>,
    next_id: u64,
}

/// Terminal failures awaiting operator replay.
///
/// Entries merge on `(symbol, data_type, stage)`: a repeated failure bumps
/// `attempt_count` and refreshes `last_seen`, `failure_reason` and
/// `last_error` on the existing entry. Entries are only removed explicitly.
#[derive(Debug, Default)]
pub struct DeadLetterQueue {
    state: Mutex<QueueState>,
}

impl DeadLetterQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry`, or merge it into the entry with the same key. Returns the entry id.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn enqueue(&self, entry: DeadLetterEntry) -> u64 {
        let mut st = self.state.lock().expect("mutex poisoned");
        let key = entry.key();
        if let Some(&id) = st.by_key.get(&key)
            && let Some(existing) = st.entries.get_mut(&id)
        {
            existing.attempt_count = existing.attempt_count.saturating_add(1);
            existing.last_seen = existing.last_seen.max(entry.last_seen);
            existing.failure_reason = entry.failure_reason;
            existing.last_error = entry.last_error;
            #[cfg(feature = "tracing")]
            tracing::warn!(
                id,
                symbol = %existing.symbol,
                data_type = %existing.data_type,
                stage = %existing.stage,
                attempts = existing.attempt_count,
                reason = %existing.failure_reason,
                "dead letter updated"
            );
            return id;
        }
        st.next_id += 1;
        let id = st.next_id;
        #[cfg(feature = "tracing")]
        tracing::warn!(
            id,
            symbol = %entry.symbol,
            data_type = %entry.data_type,
            stage = %entry.stage,
            reason = %entry.failure_reason,
            "dead letter enqueued"
        );
        st.by_key.insert(key, id);
        st.entries.insert(id, DeadLetterEntry { id, ..entry });
        id
    }

    /// Entries matching `filter`, oldest id first.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn list(&self, filter: &DeadLetterFilter) -> Vec<DeadLetterEntry> {
        let st = self.state.lock().expect("mutex poisoned");
        st.entries
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Entry by id.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn get(&self, id: u64) -> Option<DeadLetterEntry> {
        self.state
            .lock()
            .expect("mutex poisoned")
            .entries
            .get(&id)
            .cloned()
    }

    /// Turn an entry back into a forced on-demand request for its data type.
    ///
    /// The entry and its counters are kept; `requeue_count` is incremented.
    ///
    /// # Errors
    /// `NotFound` if no entry has this id.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn requeue(&self, id: u64) -> Result<RefreshRequest, IngestError> {
        let mut st = self.state.lock().expect("mutex poisoned");
        let entry = st
            .entries
            .get_mut(&id)
            .ok_or_else(|| IngestError::not_found(format!("dead letter {id}")))?;
        entry.requeue_count = entry.requeue_count.saturating_add(1);
        #[cfg(feature = "tracing")]
        tracing::info!(id, symbol = %entry.symbol, data_type = %entry.data_type, "dead letter requeued");
        Ok(RefreshRequest::new(
            entry.symbol.clone(),
            [entry.data_type],
            RefreshMode::OnDemand,
            true,
        ))
    }

    /// Remove an entry, returning it.
    ///
    /// # Errors
    /// `NotFound` if no entry has this id.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn remove(&self, id: u64) -> Result<DeadLetterEntry, IngestError> {
        let mut st = self.state.lock().expect("mutex poisoned");
        let entry = st
            .entries
            .remove(&id)
            .ok_or_else(|| IngestError::not_found(format!("dead letter {id}")))?;
        st.by_key.remove(&entry.key());
        Ok(entry)
    }

    /// Number of entries.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn len(&self) -> usize {
        self.state.lock().expect("mutex poisoned").entries.len()
    }

    /// Whether the queue holds no entries.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
