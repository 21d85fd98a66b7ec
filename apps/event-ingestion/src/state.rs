//! Application state management.
//!
//! Every long-lived component is built here once and shared through `Arc`s:
//! the aggregation engine, the ingestion buffer with its dead-letter list,
//! and the event service the HTTP handlers call.

use crate::config::Config;
use chrono::Utc;
use domain_events::{
    AggregationEngine, EventLog, EventRecord, EventService, JsonlEventLog, NoopEventLog,
    retention_cutoff,
};
use ingest_buffer::{BufferConfig, DeadLetterList, IngestBuffer};
use std::sync::Arc;
use tracing::{info, warn};

const BUFFER_NAME: &str = "events";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub buffer_config: BufferConfig,
    pub engine: Arc<AggregationEngine>,
    pub buffer: Arc<IngestBuffer<EventRecord>>,
    pub dlq: Arc<DeadLetterList<EventRecord>>,
    pub events: Arc<EventService>,
}

impl AppState {
    /// Build all components and restore aggregation state from the event log.
    pub async fn new(config: Config) -> eyre::Result<Self> {
        let log: Arc<dyn EventLog> = match &config.aggregation.event_log_path {
            Some(path) => {
                let log = JsonlEventLog::open(path).await.map_err(|e| {
                    eyre::eyre!("Failed to open event log {}: {}", path.display(), e)
                })?;
                Arc::new(log)
            }
            None => {
                warn!("EVENT_LOG_PATH not set; queued and applied events are lost on restart");
                Arc::new(NoopEventLog)
            }
        };

        let log_backend = log.backend();
        let engine: Arc<AggregationEngine> = Arc::new(AggregationEngine::new(log));
        let seen_cutoff = retention_cutoff(
            Utc::now().date_naive(),
            config.aggregation.seen_id_retention_days,
        );
        let restored = engine.restore_from_log(Some(seen_cutoff)).await?;
        info!(
            applied = restored.applied,
            log = log_backend,
            "Aggregation engine ready"
        );

        let buffer_config = BufferConfig::from_ingest_config(BUFFER_NAME, &config.ingest);
        let buffer = Arc::new(IngestBuffer::new(
            &buffer_config.name,
            buffer_config.capacity,
        ));
        let dlq = Arc::new(DeadLetterList::new(
            &buffer_config.name,
            buffer_config.dlq_max_length,
        ));

        let events = Arc::new(
            EventService::new(engine.clone(), buffer.clone())
                .with_max_query_days(config.aggregation.max_query_days),
        );

        Ok(Self {
            config,
            buffer_config,
            engine,
            buffer,
            dlq,
            events,
        })
    }
}
