//! Buffer configuration
//!
//! This module provides `BufferConfig` for sizing the buffer and its drain workers.

use core_config::ingest::IngestConfig;
use std::time::Duration;

/// Configuration for the ingestion buffer and its drain workers
#[derive(Debug, Clone, PartialEq)]
pub struct BufferConfig {
    /// Logical name used for metric labels and logs
    pub name: String,

    /// Maximum outstanding items (queued + in flight)
    pub capacity: usize,

    /// Largest batch handed to the sink
    pub max_batch_size: usize,

    /// Longest a worker waits to fill a batch once the first item is available
    pub max_wait: Duration,

    /// Number of concurrent drain workers
    pub workers: usize,

    /// Delivery attempts before a batch is dead-lettered
    pub max_attempts: u32,

    /// First retry delay; doubles per attempt
    pub backoff_base: Duration,

    /// Retry delay ceiling
    pub backoff_max: Duration,

    /// Dead-letter list bound; oldest entries are trimmed first
    pub dlq_max_length: usize,
}

impl BufferConfig {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            max_batch_size: 500,
            max_wait: Duration::from_millis(250),
            workers: 2,
            max_attempts: 5,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_secs(5),
            dlq_max_length: 10_000,
        }
    }

    /// Build from the environment-driven ingest settings
    pub fn from_ingest_config(name: impl Into<String>, config: &IngestConfig) -> Self {
        Self::new(name, config.buffer_capacity)
            .with_max_batch_size(config.max_batch_size)
            .with_max_wait(config.max_wait)
            .with_workers(config.drain_workers)
            .with_max_attempts(config.max_attempts)
            .with_backoff(config.backoff_base, config.backoff_max)
            .with_dlq_max_length(config.dlq_max_length)
    }

    /// Set the maximum batch size
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    /// Set the batch fill wait
    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    /// Set the number of drain workers
    pub fn with_workers(mut self, count: usize) -> Self {
        self.workers = count.max(1);
        self
    }

    /// Set the delivery attempts before dead-lettering
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the retry backoff bounds
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max.max(base);
        self
    }

    /// Set the dead-letter list bound
    pub fn with_dlq_max_length(mut self, max_length: usize) -> Self {
        self.dlq_max_length = max_length.max(1);
        self
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new("events", 10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let config = BufferConfig::new("events", 64)
            .with_max_batch_size(8)
            .with_workers(0)
            .with_max_attempts(3)
            .with_backoff(Duration::from_millis(50), Duration::from_millis(10));

        assert_eq!(config.capacity, 64);
        assert_eq!(config.max_batch_size, 8);
        assert_eq!(config.workers, 1);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_max, Duration::from_millis(50));
    }

    #[test]
    fn test_from_ingest_config() {
        let ingest = IngestConfig {
            buffer_capacity: 32,
            drain_workers: 3,
            dlq_max_length: 7,
            ..IngestConfig::default()
        };

        let config = BufferConfig::from_ingest_config("events", &ingest);

        assert_eq!(config.name, "events");
        assert_eq!(config.capacity, 32);
        assert_eq!(config.workers, 3);
        assert_eq!(config.dlq_max_length, 7);
        assert_eq!(config.max_batch_size, ingest.max_batch_size);
    }
}
