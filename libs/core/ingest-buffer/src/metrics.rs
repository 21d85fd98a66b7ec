//! Prometheus metrics for the ingestion buffer
//!
//! Provides observability into admission, drain throughput, and failures.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics
///
/// Call this once at startup. Subsequent calls are no-ops.
pub fn init_metrics() -> Result<(), BuildError> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics initialized");
        Ok::<_, BuildError>(handle)
    })?;
    Ok(())
}

/// Get the Prometheus handle for rendering metrics
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus format
pub fn render_metrics() -> String {
    prometheus_handle().map(|h| h.render()).unwrap_or_default()
}

/// Buffer metrics helper
#[derive(Clone, Debug)]
pub struct BufferMetrics {
    /// Buffer name for labeling
    buffer: String,
}

impl BufferMetrics {
    pub fn new(buffer: impl Into<String>) -> Self {
        Self {
            buffer: buffer.into(),
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Record items admitted by `submit`
    pub fn items_submitted(&self, count: usize) {
        counter!(
            "ingest_buffer_items_submitted_total",
            "buffer" => self.buffer.clone()
        )
        .increment(count as u64);
    }

    /// Record a rejected submission
    pub fn submit_rejected(&self, reason: &'static str, count: usize) {
        counter!(
            "ingest_buffer_items_rejected_total",
            "buffer" => self.buffer.clone(),
            "reason" => reason
        )
        .increment(count as u64);
    }

    /// Update the outstanding gauge
    pub fn outstanding(&self, count: usize) {
        gauge!(
            "ingest_buffer_outstanding",
            "buffer" => self.buffer.clone()
        )
        .set(count as f64);
    }

    /// Record a batch delivered to the sink
    pub fn batch_processed(&self, sink: &'static str, size: usize, duration: Duration) {
        counter!(
            "ingest_buffer_batches_processed_total",
            "buffer" => self.buffer.clone(),
            "sink" => sink,
            "status" => "success"
        )
        .increment(1);

        histogram!(
            "ingest_buffer_batch_size",
            "buffer" => self.buffer.clone()
        )
        .record(size as f64);

        histogram!(
            "ingest_buffer_drain_duration_seconds",
            "buffer" => self.buffer.clone(),
            "sink" => sink
        )
        .record(duration.as_secs_f64());
    }

    /// Record a failed delivery attempt
    pub fn batch_failed(&self, sink: &'static str, category: &'static str) {
        counter!(
            "ingest_buffer_batches_processed_total",
            "buffer" => self.buffer.clone(),
            "sink" => sink,
            "status" => "failed"
        )
        .increment(1);

        counter!(
            "ingest_buffer_sink_errors_total",
            "buffer" => self.buffer.clone(),
            "sink" => sink,
            "category" => category
        )
        .increment(1);
    }

    /// Record a batch being retried
    pub fn batch_retried(&self) {
        counter!(
            "ingest_buffer_batches_retried_total",
            "buffer" => self.buffer.clone()
        )
        .increment(1);
    }

    /// Record a batch moved to the dead-letter list
    pub fn batch_dead_lettered(&self, size: usize) {
        counter!(
            "ingest_buffer_batches_dlq_total",
            "buffer" => self.buffer.clone()
        )
        .increment(1);

        counter!(
            "ingest_buffer_items_dlq_total",
            "buffer" => self.buffer.clone()
        )
        .increment(size as u64);
    }

    /// Update the dead-letter list length gauge
    pub fn dlq_length(&self, length: usize) {
        gauge!(
            "ingest_buffer_dlq_length",
            "buffer" => self.buffer.clone()
        )
        .set(length as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = BufferMetrics::new("events");
        assert_eq!(metrics.buffer(), "events");
        // Recording without an installed recorder is a no-op
        metrics.items_submitted(3);
        metrics.batch_processed("engine", 3, Duration::from_millis(2));
    }

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(prometheus_handle().is_some());
    }
}
