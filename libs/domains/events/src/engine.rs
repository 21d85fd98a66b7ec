//! DAU aggregation engine
//!
//! Owns one presence set per UTC day and a seen-id index that makes ingest
//! idempotent. Buckets are locked individually, so writers touching
//! different days never contend.

use crate::error::{IngestError, InvalidRangeError};
use crate::models::{DauPoint, EngineStats, EventRecord, IngestReport, RetentionReport};
use crate::presence::{ExactPresence, PresenceSet};
use crate::repository::EventLog;
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ingest_buffer::{BatchSink, BufferError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub struct AggregationEngine<S: PresenceSet = ExactPresence> {
    buckets: DashMap<NaiveDate, Arc<Mutex<S>>>,
    seen: DashMap<Uuid, NaiveDate>,
    log: Arc<dyn EventLog>,
    applied_total: AtomicU64,
    duplicates_total: AtomicU64,
}

impl<S: PresenceSet> AggregationEngine<S> {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self {
            buckets: DashMap::new(),
            seen: DashMap::new(),
            log,
            applied_total: AtomicU64::new(0),
            duplicates_total: AtomicU64::new(0),
        }
    }

    /// Apply a batch of records.
    ///
    /// Records whose `event_id` was already applied are counted as
    /// duplicates. Fresh ids are claimed in the seen-id index before the log
    /// append, so concurrent batches carrying the same id append it once. If
    /// the append fails the claims are released and no state changes.
    #[instrument(skip(self, batch), fields(batch_size = batch.len(), log = self.log.backend()))]
    pub async fn ingest(&self, batch: &[EventRecord]) -> Result<IngestReport, IngestError> {
        let mut batch_ids = HashSet::with_capacity(batch.len());
        let mut claimed = Vec::with_capacity(batch.len());
        let mut report = IngestReport::default();

        for record in batch {
            if !batch_ids.insert(record.event_id) {
                report.duplicates += 1;
                continue;
            }
            match self.seen.entry(record.event_id) {
                Entry::Occupied(_) => report.duplicates += 1,
                Entry::Vacant(slot) => {
                    slot.insert(record.day());
                    claimed.push(record.clone());
                }
            }
        }

        if !claimed.is_empty() {
            if let Err(e) = self.log.append(&claimed).await {
                for record in &claimed {
                    self.seen.remove(&record.event_id);
                }
                return Err(e);
            }
        }

        for record in &claimed {
            self.mark_present(record);
        }
        report.applied = claimed.len();

        self.record_totals(report);
        debug!(
            applied = report.applied,
            duplicates = report.duplicates,
            "Batch ingested"
        );
        Ok(report)
    }

    /// Rebuild in-memory state from the event log without re-appending.
    ///
    /// Records dated before `seen_cutoff` only restore presence; their ids
    /// stay out of the seen-id index, as if the retention sweep had already
    /// run.
    #[instrument(skip(self), fields(log = self.log.backend()))]
    pub async fn restore_from_log(
        &self,
        seen_cutoff: Option<NaiveDate>,
    ) -> Result<IngestReport, IngestError> {
        let records = self.log.replay().await?;
        let mut report = IngestReport::default();

        for record in &records {
            let expired = seen_cutoff.is_some_and(|cutoff| record.day() < cutoff);
            if !expired {
                match self.seen.entry(record.event_id) {
                    Entry::Occupied(_) => {
                        report.duplicates += 1;
                        continue;
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(record.day());
                    }
                }
            }
            self.mark_present(record);
            report.applied += 1;
        }

        self.record_totals(report);
        info!(
            replayed = records.len(),
            applied = report.applied,
            duplicates = report.duplicates,
            seen_ids = self.seen.len(),
            "Restored aggregation state from event log"
        );
        Ok(report)
    }

    /// Apply the retention window: forget seen ids before `cutoff` and
    /// compact the event log to what presence still needs.
    #[instrument(skip(self), fields(log = self.log.backend()))]
    pub async fn compact_before(&self, cutoff: NaiveDate) -> Result<RetentionReport, IngestError> {
        let evicted_ids = self.evict_seen_before(cutoff);
        let compacted_records = self.log.compact_before(cutoff).await?;
        Ok(RetentionReport {
            evicted_ids,
            compacted_records,
        })
    }

    /// Daily distinct-user counts for `start..=end`, ascending.
    ///
    /// `end` defaults to `start`. Days without events report zero.
    pub fn query_dau(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DauPoint>, InvalidRangeError> {
        let end = end.unwrap_or(start);
        if end < start {
            return Err(InvalidRangeError { start, end });
        }

        Ok(start
            .iter_days()
            .take_while(|day| *day <= end)
            .map(|date| DauPoint {
                date,
                count: self.bucket(date).map_or(0, |b| b.lock().count()),
            })
            .collect())
    }

    /// Whether `event_id` has been applied and is still tracked.
    pub fn is_seen(&self, event_id: &Uuid) -> bool {
        self.seen.contains_key(event_id)
    }

    /// Forget seen ids whose event day is before `cutoff`.
    ///
    /// Presence sets are untouched; a re-delivered event older than the
    /// cutoff can only change a count if its user was absent that day.
    pub fn evict_seen_before(&self, cutoff: NaiveDate) -> usize {
        let mut evicted = 0;
        self.seen.retain(|_, day| {
            let keep = *day >= cutoff;
            if !keep {
                evicted += 1;
            }
            keep
        });
        if evicted > 0 {
            info!(evicted, %cutoff, "Evicted seen event ids");
        }
        evicted
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            buckets: self.buckets.len(),
            seen_ids: self.seen.len(),
            applied_total: self.applied_total.load(Ordering::Relaxed),
            duplicates_total: self.duplicates_total.load(Ordering::Relaxed),
        }
    }

    fn mark_present(&self, record: &EventRecord) {
        let bucket = self
            .buckets
            .entry(record.day())
            .or_insert_with(|| Arc::new(Mutex::new(S::default())))
            .clone();
        bucket.lock().insert(&record.user_id);
    }

    fn bucket(&self, day: NaiveDate) -> Option<Arc<Mutex<S>>> {
        self.buckets.get(&day).map(|b| b.value().clone())
    }

    fn record_totals(&self, report: IngestReport) {
        self.applied_total
            .fetch_add(report.applied as u64, Ordering::Relaxed);
        self.duplicates_total
            .fetch_add(report.duplicates as u64, Ordering::Relaxed);
    }
}

#[async_trait]
impl<S: PresenceSet> BatchSink<EventRecord> for AggregationEngine<S> {
    async fn process(&self, batch: &[EventRecord]) -> Result<(), BufferError> {
        self.ingest(batch)
            .await
            .map(|_| ())
            .map_err(|e| BufferError::transient(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "aggregation_engine"
    }

    fn stats(&self) -> serde_json::Value {
        serde_json::to_value(self.stats()).unwrap_or_default()
    }
}
