//! Drain workers.
//!
//! This module provides:
//! - `BatchSink` trait for whatever consumes drained batches
//! - `DrainWorker` which moves batches from the buffer into a sink with
//!   retry, backoff and dead-lettering

use crate::buffer::IngestBuffer;
use crate::config::BufferConfig;
use crate::dlq::DeadLetterList;
use crate::error::BufferError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Trait for batch consumers.
///
/// # Example
///
/// ```rust,ignore
/// use ingest_buffer::{BatchSink, BufferError};
///
/// struct Counter(AtomicUsize);
///
/// #[async_trait]
/// impl BatchSink<u32> for Counter {
///     async fn process(&self, batch: &[u32]) -> Result<(), BufferError> {
///         self.0.fetch_add(batch.len(), Ordering::SeqCst);
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "counter"
///     }
/// }
/// ```
#[async_trait]
pub trait BatchSink<T>: Send + Sync {
    /// Apply a batch.
    ///
    /// Must be safe to call again with the same batch after an error; the
    /// worker retries transient failures.
    async fn process(&self, batch: &[T]) -> Result<(), BufferError>;

    /// Sink name for logs and metric labels.
    fn name(&self) -> &'static str;

    /// Sink-specific counters for the admin endpoint.
    fn stats(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Moves batches from an [`IngestBuffer`] into a [`BatchSink`].
///
/// A batch is acknowledged only after the sink confirms it or after it has
/// been dead-lettered.
pub struct DrainWorker<T, S>
where
    S: BatchSink<T>,
{
    id: usize,
    buffer: Arc<IngestBuffer<T>>,
    dlq: Arc<DeadLetterList<T>>,
    sink: Arc<S>,
    config: BufferConfig,
}

impl<T, S> DrainWorker<T, S>
where
    T: Send + Sync + 'static,
    S: BatchSink<T> + 'static,
{
    pub fn new(
        id: usize,
        buffer: Arc<IngestBuffer<T>>,
        dlq: Arc<DeadLetterList<T>>,
        sink: Arc<S>,
        config: BufferConfig,
    ) -> Self {
        Self {
            id,
            buffer,
            dlq,
            sink,
            config,
        }
    }

    /// Run the worker loop.
    ///
    /// On shutdown the buffer is closed, whatever is still queued is
    /// delivered, and the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            worker = self.id,
            buffer = %self.config.name,
            sink = %self.sink.name(),
            max_batch_size = self.config.max_batch_size,
            max_wait_ms = self.config.max_wait.as_millis() as u64,
            "Starting drain worker"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                batch = self.buffer.next_batch(self.config.max_batch_size, self.config.max_wait) => {
                    match batch {
                        Some(batch) => self.deliver(batch).await,
                        // Closed and drained.
                        None => {
                            info!(worker = self.id, "Drain worker stopped");
                            return;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(worker = self.id, "Received shutdown signal, draining remaining items");
        self.buffer.close();
        while let Some(batch) = self.buffer.try_take(self.config.max_batch_size) {
            self.deliver(batch).await;
        }
        info!(worker = self.id, "Drain worker stopped");
    }

    /// Deliver one batch, retrying transient failures with backoff.
    async fn deliver(&self, batch: Vec<T>) {
        let size = batch.len();
        let sink_name = self.sink.name();
        let metrics = self.buffer.metrics();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let start = Instant::now();

            match self.sink.process(&batch).await {
                Ok(()) => {
                    metrics.batch_processed(sink_name, size, start.elapsed());
                    debug!(
                        worker = self.id,
                        items = size,
                        attempt = attempt,
                        "Batch delivered"
                    );
                    break;
                }
                Err(e) => {
                    let category = e.category();
                    metrics.batch_failed(sink_name, category.as_str());

                    if !e.should_retry(attempt, self.config.max_attempts) {
                        self.dlq.push(batch, &e.to_string(), attempt);
                        break;
                    }

                    let delay = category.backoff_delay(
                        self.config.backoff_base,
                        self.config.backoff_max,
                        attempt - 1,
                    );
                    warn!(
                        worker = self.id,
                        items = size,
                        attempt = attempt,
                        max_attempts = self.config.max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Batch delivery failed, retrying"
                    );
                    metrics.batch_retried();
                    tokio::time::sleep(delay).await;
                }
            }
        }

        self.buffer.ack(size);
    }
}

/// Spawn `config.workers` drain workers sharing one buffer, DLQ, and sink.
pub fn spawn_drain_workers<T, S>(
    buffer: Arc<IngestBuffer<T>>,
    dlq: Arc<DeadLetterList<T>>,
    sink: Arc<S>,
    config: &BufferConfig,
    shutdown: watch::Receiver<bool>,
) -> JoinSet<()>
where
    T: Send + Sync + 'static,
    S: BatchSink<T> + 'static,
{
    let mut workers = JoinSet::new();
    for id in 0..config.workers {
        let worker = DrainWorker::new(
            id,
            buffer.clone(),
            dlq.clone(),
            sink.clone(),
            config.clone(),
        );
        workers.spawn(worker.run(shutdown.clone()));
    }
    workers
}
