//! Event service layer

use crate::coordinator::QueryCoordinator;
use crate::engine::AggregationEngine;
use crate::error::{EventError, Result};
use crate::models::{DauPoint, EventRecord, IngestItemResult, IngestStatus};
use crate::normalizer::normalize;
use crate::presence::{ExactPresence, PresenceSet};
use ingest_buffer::IngestBuffer;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Front door for both the write and the read path.
///
/// Writes are normalized here and handed to the buffer; the aggregation
/// engine only ever sees records that passed validation.
pub struct EventService<S: PresenceSet = ExactPresence> {
    engine: Arc<AggregationEngine<S>>,
    buffer: Arc<IngestBuffer<EventRecord>>,
    coordinator: QueryCoordinator<S>,
}

impl<S: PresenceSet> EventService<S> {
    pub fn new(engine: Arc<AggregationEngine<S>>, buffer: Arc<IngestBuffer<EventRecord>>) -> Self {
        Self {
            coordinator: QueryCoordinator::new(engine.clone()),
            engine,
            buffer,
        }
    }

    /// Cap the number of days a single DAU query may span
    pub fn with_max_query_days(mut self, days: u32) -> Self {
        self.coordinator = self.coordinator.with_max_range_days(days);
        self
    }

    pub fn engine(&self) -> &Arc<AggregationEngine<S>> {
        &self.engine
    }

    /// Validate a request body and submit the accepted events.
    ///
    /// The body must be a JSON array of objects. Every item is echoed back
    /// with its status. Either all accepted items are admitted to the buffer
    /// or none are.
    #[instrument(skip(self, body))]
    pub fn ingest(&self, body: Value) -> Result<Vec<IngestItemResult>> {
        let items = parse_batch(body)?;
        let total = items.len();

        let mut results = Vec::with_capacity(total);
        let mut accepted = Vec::new();
        let mut request_ids = HashSet::new();

        for raw in items {
            match normalize(&Value::Object(raw.clone())) {
                Ok(record) => {
                    if self.engine.is_seen(&record.event_id)
                        || !request_ids.insert(record.event_id)
                    {
                        results.push(IngestItemResult::duplicate(&record));
                    } else {
                        results.push(IngestItemResult::accepted(&record));
                        accepted.push(record);
                    }
                }
                Err(e) => results.push(IngestItemResult::rejected(raw, e.to_string())),
            }
        }

        let rejected = results
            .iter()
            .filter(|r| r.status == IngestStatus::Rejected)
            .count();
        if total > 0 && rejected == total {
            warn!(total, "Every event in the batch was rejected");
            return Err(EventError::AllRejected(results));
        }

        let admitted = if accepted.is_empty() {
            0
        } else {
            self.buffer.submit(accepted)?
        };

        info!(
            total,
            accepted = admitted,
            duplicates = total - admitted - rejected,
            rejected,
            "Events submitted"
        );
        Ok(results)
    }

    pub fn get_dau(&self, start_date: &str, end_date: Option<&str>) -> Result<Vec<DauPoint>> {
        self.coordinator.get_dau(start_date, end_date)
    }
}

fn parse_batch(body: Value) -> Result<Vec<Map<String, Value>>> {
    let Value::Array(items) = body else {
        return Err(EventError::MalformedBody(
            "request body must be a JSON array of event objects".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(EventError::MalformedBody(format!(
                "item {index} is not a JSON object"
            ))),
        })
        .collect()
}
