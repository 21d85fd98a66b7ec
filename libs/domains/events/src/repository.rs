//! Event log trait

use crate::error::IngestError;
use crate::models::EventRecord;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Append-only record of every event the engine applied.
///
/// The engine appends newly seen records before applying them, and replays
/// the log on startup to rebuild its in-memory state.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Durably append records. On error nothing may be considered written.
    async fn append(&self, records: &[EventRecord]) -> Result<(), IngestError>;

    /// Every record appended so far, in append order.
    async fn replay(&self) -> Result<Vec<EventRecord>, IngestError>;

    /// Shrink the log: records dated before `cutoff` are reduced to one per
    /// `(day, user_id)`, which is all presence needs. Returns how many
    /// records were removed.
    async fn compact_before(&self, cutoff: NaiveDate) -> Result<usize, IngestError>;

    /// Short backend name for logs and stats
    fn backend(&self) -> &'static str;
}
