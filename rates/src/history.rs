//! Append-only rate history, capped to the most recent entries.

use std::sync::Arc;

use tracing::debug;

use crate::error::RatesResult;
use crate::snapshot::{HistoryEntry, HistoryFile};
use crate::store::{load_typed, save_typed, BlobStore};

/// Maximum number of retained history entries.
pub const HISTORY_LIMIT: usize = 1000;

/// History log over a blob store.
#[derive(Clone)]
pub struct HistoryLog {
    store: Arc<dyn BlobStore>,
    limit: usize,
}

impl HistoryLog {
    /// Create a log retaining `HISTORY_LIMIT` entries.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            limit: HISTORY_LIMIT,
        }
    }

    /// Override the retention limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Append an entry, evicting the oldest ones past the limit.
    pub fn append(&self, entry: HistoryEntry) -> RatesResult<usize> {
        let mut file: HistoryFile = load_typed(self.store.as_ref())?;
        file.history.push(entry);

        if file.history.len() > self.limit {
            let excess = file.history.len() - self.limit;
            file.history.drain(..excess);
            debug!(evicted = excess, "Trimmed rate history");
        }

        save_typed(self.store.as_ref(), &file)?;
        Ok(file.history.len())
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> RatesResult<Vec<HistoryEntry>> {
        let file: HistoryFile = load_typed(self.store.as_ref())?;
        Ok(file.history)
    }
}
