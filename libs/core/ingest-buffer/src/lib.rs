//! Ingestion Buffer
//!
//! A bounded in-memory buffer that decouples request handlers from a slower
//! batch consumer.
//!
//! ## Features
//!
//! - **All-or-nothing admission**: `submit` admits a whole batch or none of it
//! - **Batch drain workers**: `DrainWorker` moves batches into any `BatchSink`
//! - **At-least-once delivery**: slots are released only after the sink confirms
//! - **Dead-letter list**: batches that exhaust their retries are kept for operators
//! - **Prometheus metrics**: Built-in observability
//! - **Admin endpoints**: buffer stats and DLQ management
//!
//! ## Example
//!
//! ```ignore
//! use ingest_buffer::{BufferConfig, DeadLetterList, IngestBuffer, spawn_drain_workers};
//!
//! let config = BufferConfig::new("events", 10_000).with_workers(2);
//! let buffer = Arc::new(IngestBuffer::new(&config.name, config.capacity));
//! let dlq = Arc::new(DeadLetterList::new(&config.name, config.dlq_max_length));
//!
//! let workers = spawn_drain_workers(buffer.clone(), dlq, sink, &config, shutdown_rx);
//! buffer.submit(records)?;
//! ```

mod admin;
mod buffer;
mod config;
mod dlq;
mod error;
pub mod metrics;
mod worker;

// Re-export main types
pub use admin::{AdminState, admin_router};
pub use buffer::{BufferStats, IngestBuffer};
pub use config::BufferConfig;
pub use dlq::{DeadLetterList, DlqEntry, DlqStats};
pub use error::{BufferError, ErrorCategory};
pub use metrics::{BufferMetrics, init_metrics};
pub use worker::{BatchSink, DrainWorker, spawn_drain_workers};
