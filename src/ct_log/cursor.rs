// src/ct_log/cursor.rs
//! Per-shard read position

use std::ops::Range;

/// Next unread index for one log shard.
///
/// Starts uninitialized; the first successful tree-size fetch places it
/// `lookback` entries behind the head. After that it only moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCursor {
    shard_id: String,
    endpoint: String,
    next_index: Option<u64>,
}

impl LogCursor {
    pub fn new(shard_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
            endpoint: endpoint.into(),
            next_index: None,
        }
    }

    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_initialized(&self) -> bool {
        self.next_index.is_some()
    }

    pub fn position(&self) -> Option<u64> {
        self.next_index
    }

    /// Place the cursor `lookback` entries behind `tree_size` (clamped at 0).
    /// No effect once initialized.
    pub fn initialize(&mut self, tree_size: u64, lookback: u64) -> u64 {
        *self
            .next_index
            .get_or_insert_with(|| tree_size.saturating_sub(lookback))
    }

    /// Range to fetch this cycle, bounded by `max_batch`.
    /// `None` when uninitialized or there is nothing new.
    pub fn next_batch(&self, tree_size: u64, max_batch: u64) -> Option<Range<u64>> {
        let start = self.next_index?;
        if tree_size <= start || max_batch == 0 {
            return None;
        }
        let end = start.saturating_add(max_batch).min(tree_size);
        Some(start..end)
    }

    /// Move forward to `index`. Never moves backwards.
    pub fn advance_to(&mut self, index: u64) {
        match self.next_index {
            Some(current) if current >= index => {}
            _ => self.next_index = Some(index),
        }
    }
}
