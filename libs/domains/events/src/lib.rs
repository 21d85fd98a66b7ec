//! Events Domain
//!
//! Event ingestion and daily-active-user analytics:
//! - a pure normalizer that validates raw JSON into [`EventRecord`]s
//! - an aggregation engine with per-day presence sets and a seen-id index
//! - an append-only [`EventLog`] the engine replays on startup, compacted
//!   by the retention sweep
//! - a query coordinator for DAU ranges
//!
//! # Architecture
//!
//! ```text
//! POST /events ─► normalize ─► IngestBuffer ─► drain workers ─► AggregationEngine
//!                                                                   │
//!                                                           EventLog::append
//!
//! GET /stats/dau ─► QueryCoordinator ─► AggregationEngine::query_dau
//! ```

use utoipa::OpenApi;

mod coordinator;
mod engine;
mod error;
mod event_log;
mod handlers;
mod models;
mod normalizer;
mod presence;
mod repository;
mod retention;
mod service;

pub use coordinator::{DEFAULT_MAX_RANGE_DAYS, QueryCoordinator};
pub use engine::AggregationEngine;
pub use error::{EventError, IngestError, InvalidRangeError, Result};
pub use event_log::{JsonlEventLog, MemoryEventLog, NoopEventLog};
pub use handlers::{EventsState, events_router};
pub use models::{
    DauPoint, DauQuery, EngineStats, EventRecord, IngestItemResult, IngestReport, IngestStatus,
    RetentionReport,
};
pub use normalizer::{ValidationError, normalize};
pub use presence::{ExactPresence, PresenceSet};
pub use repository::EventLog;
pub use retention::{RetentionSweeper, retention_cutoff};
pub use service::EventService;

/// OpenAPI documentation for Events API
#[derive(OpenApi)]
#[openapi(
    paths(handlers::ingest_events, handlers::get_dau),
    components(schemas(
        EventRecord,
        IngestItemResult,
        IngestStatus,
        DauPoint,
        axum_helpers::ErrorResponse,
    )),
    tags(
        (name = "events", description = "Event ingestion"),
        (name = "stats", description = "Daily active user statistics")
    )
)]
pub struct ApiDoc;
