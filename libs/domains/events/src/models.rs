//! Event domain models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

/// A validated, canonical event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventRecord {
    /// Globally unique id; the dedup key
    pub event_id: Uuid,

    /// When the event happened, in UTC
    pub occurred_at: DateTime<Utc>,

    /// Opaque, non-empty actor id
    pub user_id: String,

    /// Non-empty event category
    pub event_type: String,

    /// Open payload, preserved verbatim
    #[serde(default)]
    #[schema(value_type = Object)]
    pub properties: Map<String, Value>,
}

impl EventRecord {
    /// UTC calendar day used for bucketing
    pub fn day(&self) -> NaiveDate {
        self.occurred_at.date_naive()
    }
}

/// Per-item outcome of `POST /events`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Accepted,
    Duplicate,
    Rejected,
}

/// An echoed item with its ingestion status.
///
/// Accepted and duplicate items echo the canonical record; rejected items
/// echo the submitted object.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestItemResult {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub event: Map<String, Value>,

    pub status: IngestStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestItemResult {
    pub fn accepted(record: &EventRecord) -> Self {
        Self::from_record(record, IngestStatus::Accepted)
    }

    pub fn duplicate(record: &EventRecord) -> Self {
        Self::from_record(record, IngestStatus::Duplicate)
    }

    pub fn rejected(mut raw: Map<String, Value>, error: impl Into<String>) -> Self {
        raw.remove("status");
        raw.remove("error");
        Self {
            event: raw,
            status: IngestStatus::Rejected,
            error: Some(error.into()),
        }
    }

    fn from_record(record: &EventRecord, status: IngestStatus) -> Self {
        let event = match serde_json::to_value(record) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            event,
            status,
            error: None,
        }
    }
}

/// Counts returned by a single engine ingest call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IngestReport {
    pub applied: usize,
    pub duplicates: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.applied += other.applied;
        self.duplicates += other.duplicates;
    }
}

/// Outcome of one retention pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RetentionReport {
    /// Seen ids dropped from the dedup index
    pub evicted_ids: usize,
    /// Records removed from the event log
    pub compacted_records: usize,
}

/// One day of a DAU series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DauPoint {
    #[schema(value_type = String, format = Date, example = "2024-01-01")]
    pub date: NaiveDate,
    pub count: u64,
}

/// Query parameters for `GET /stats/dau`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DauQuery {
    /// First day, `YYYY-MM-DD`
    pub start_date: String,
    /// Last day (inclusive), `YYYY-MM-DD`; defaults to `start_date`
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Aggregation engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EngineStats {
    pub buckets: usize,
    pub seen_ids: usize,
    pub applied_total: u64,
    pub duplicates_total: u64,
}
