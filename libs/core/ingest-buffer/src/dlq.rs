//! Dead-letter list
//!
//! Holds batches that exhausted their delivery attempts so operators can
//! inspect, requeue, or discard them. Nothing is dropped silently: when the
//! list is at `max_length`, trimming the oldest entry is logged at `warn`.

use crate::metrics::BufferMetrics;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// DLQ entry
#[derive(Debug, Clone, Serialize)]
pub struct DlqEntry<T> {
    pub id: Uuid,

    /// The undelivered batch, in submission order
    pub batch: Vec<T>,

    /// Error message from the last attempt
    pub error: String,

    /// Number of delivery attempts made
    pub attempts: u32,

    /// When the batch was dead-lettered
    pub failed_at: DateTime<Utc>,
}

/// DLQ statistics
#[derive(Debug, Clone, Serialize)]
pub struct DlqStats {
    pub length: usize,
    pub max_length: usize,
    pub queued_items: usize,
    pub total_dead_lettered: u64,
    pub total_trimmed: u64,
    pub oldest_failed_at: Option<DateTime<Utc>>,
    pub newest_failed_at: Option<DateTime<Utc>>,
}

pub struct DeadLetterList<T> {
    entries: Mutex<VecDeque<DlqEntry<T>>>,
    max_length: usize,
    total_dead_lettered: AtomicU64,
    total_trimmed: AtomicU64,
    metrics: BufferMetrics,
}

impl<T> DeadLetterList<T> {
    pub fn new(buffer_name: impl Into<String>, max_length: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_length: max_length.max(1),
            total_dead_lettered: AtomicU64::new(0),
            total_trimmed: AtomicU64::new(0),
            metrics: BufferMetrics::new(buffer_name),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Move a failed batch to the list
    pub fn push(&self, batch: Vec<T>, error: &str, attempts: u32) -> Uuid {
        let entry = DlqEntry {
            id: Uuid::new_v4(),
            batch,
            error: error.to_string(),
            attempts,
            failed_at: Utc::now(),
        };
        let id = entry.id;
        let size = entry.batch.len();

        let length = {
            let mut entries = self.entries.lock();
            while entries.len() >= self.max_length {
                if let Some(trimmed) = entries.pop_front() {
                    self.total_trimmed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        dlq_id = %trimmed.id,
                        items = trimmed.batch.len(),
                        error = %trimmed.error,
                        max_length = self.max_length,
                        "DLQ at capacity, trimmed oldest entry"
                    );
                }
            }
            entries.push_back(entry);
            entries.len()
        };

        self.total_dead_lettered.fetch_add(1, Ordering::Relaxed);
        self.metrics.batch_dead_lettered(size);
        self.metrics.dlq_length(length);

        error!(
            dlq_id = %id,
            items = size,
            attempts = attempts,
            error = %error,
            "Moved batch to DLQ"
        );

        id
    }

    /// Get DLQ statistics
    pub fn stats(&self) -> DlqStats {
        let entries = self.entries.lock();
        DlqStats {
            length: entries.len(),
            max_length: self.max_length,
            queued_items: entries.iter().map(|e| e.batch.len()).sum(),
            total_dead_lettered: self.total_dead_lettered.load(Ordering::Relaxed),
            total_trimmed: self.total_trimmed.load(Ordering::Relaxed),
            oldest_failed_at: entries.front().map(|e| e.failed_at),
            newest_failed_at: entries.back().map(|e| e.failed_at),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove an entry from the list
    pub fn delete(&self, id: Uuid) -> bool {
        self.take(id).is_some()
    }

    /// Remove and return an entry, e.g. to requeue it
    pub fn take(&self, id: Uuid) -> Option<DlqEntry<T>> {
        let (entry, length) = {
            let mut entries = self.entries.lock();
            let position = entries.iter().position(|e| e.id == id)?;
            let entry = entries.remove(position);
            (entry, entries.len())
        };
        self.metrics.dlq_length(length);
        debug!(dlq_id = %id, "Removed DLQ entry");
        entry
    }

    /// Put an entry back at the head of the list after a failed requeue
    pub fn restore(&self, entry: DlqEntry<T>) {
        let length = {
            let mut entries = self.entries.lock();
            entries.push_front(entry);
            entries.len()
        };
        self.metrics.dlq_length(length);
    }

    /// Purge all entries from the DLQ
    pub fn purge(&self) -> usize {
        let count = {
            let mut entries = self.entries.lock();
            let count = entries.len();
            entries.clear();
            count
        };
        self.metrics.dlq_length(0);

        if count > 0 {
            info!(count = count, "Purged DLQ");
        }
        count
    }
}

impl<T: Clone> DeadLetterList<T> {
    /// List entries oldest first
    pub fn list(&self, limit: usize, offset: usize) -> Vec<DlqEntry<T>> {
        self.entries
            .lock()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Get a specific DLQ entry by ID
    pub fn get(&self, id: Uuid) -> Option<DlqEntry<T>> {
        self.entries.lock().iter().find(|e| e.id == id).cloned()
    }
}
