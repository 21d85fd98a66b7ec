//! Ingestion pipeline configuration: buffer sizing, drain workers, retention.

use crate::{ConfigError, FromEnv, env_optional, env_parse_or};
use std::path::PathBuf;
use std::time::Duration;

/// Sizing and retry policy for the ingestion buffer and its drain workers.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestConfig {
    /// Maximum outstanding (queued + in-flight) events
    pub buffer_capacity: usize,
    /// Largest batch handed to the aggregation engine at once
    pub max_batch_size: usize,
    /// How long a drain worker waits for a batch to fill
    pub max_wait: Duration,
    /// Number of concurrent drain workers
    pub drain_workers: usize,
    /// Attempts per batch before it is dead-lettered
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Bound on the dead-letter list
    pub dlq_max_length: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 10_000,
            max_batch_size: 500,
            max_wait: Duration::from_millis(250),
            drain_workers: 2,
            max_attempts: 5,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(5_000),
            dlq_max_length: 10_000,
        }
    }
}

impl FromEnv for IngestConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            buffer_capacity: env_parse_or("BUFFER_CAPACITY", defaults.buffer_capacity)?,
            max_batch_size: env_parse_or("BUFFER_MAX_BATCH_SIZE", defaults.max_batch_size)?,
            max_wait: Duration::from_millis(env_parse_or("BUFFER_MAX_WAIT_MS", 250u64)?),
            drain_workers: env_parse_or("DRAIN_WORKERS", defaults.drain_workers)?,
            max_attempts: env_parse_or("DRAIN_MAX_ATTEMPTS", defaults.max_attempts)?,
            backoff_base: Duration::from_millis(env_parse_or("DRAIN_BACKOFF_BASE_MS", 100u64)?),
            backoff_max: Duration::from_millis(env_parse_or("DRAIN_BACKOFF_MAX_MS", 5_000u64)?),
            dlq_max_length: env_parse_or("DLQ_MAX_LENGTH", defaults.dlq_max_length)?,
        };

        if config.buffer_capacity == 0 {
            return Err(ConfigError::ParseError {
                key: "BUFFER_CAPACITY".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }
        if config.max_batch_size == 0 {
            return Err(ConfigError::ParseError {
                key: "BUFFER_MAX_BATCH_SIZE".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(config)
    }
}

/// Aggregation-side settings: durability, seen-id retention and query bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregationConfig {
    /// JSON-lines event log; `None` keeps everything in memory
    pub event_log_path: Option<PathBuf>,
    pub seen_id_retention_days: u32,
    pub retention_sweep_interval: Duration,
    pub max_query_days: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            event_log_path: None,
            seen_id_retention_days: 30,
            retention_sweep_interval: Duration::from_secs(3_600),
            max_query_days: 366,
        }
    }
}

impl FromEnv for AggregationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            event_log_path: env_optional("EVENT_LOG_PATH").map(PathBuf::from),
            seen_id_retention_days: env_parse_or(
                "SEEN_ID_RETENTION_DAYS",
                defaults.seen_id_retention_days,
            )?,
            retention_sweep_interval: Duration::from_secs(env_parse_or(
                "RETENTION_SWEEP_INTERVAL_SECS",
                3_600u64,
            )?),
            max_query_days: env_parse_or("DAU_MAX_RANGE_DAYS", defaults.max_query_days)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INGEST_VARS: [&str; 8] = [
        "BUFFER_CAPACITY",
        "BUFFER_MAX_BATCH_SIZE",
        "BUFFER_MAX_WAIT_MS",
        "DRAIN_WORKERS",
        "DRAIN_MAX_ATTEMPTS",
        "DRAIN_BACKOFF_BASE_MS",
        "DRAIN_BACKOFF_MAX_MS",
        "DLQ_MAX_LENGTH",
    ];

    #[test]
    fn test_ingest_config_defaults() {
        temp_env::with_vars_unset(INGEST_VARS, || {
            let config = IngestConfig::from_env().unwrap();
            assert_eq!(config, IngestConfig::default());
        });
    }

    #[test]
    fn test_ingest_config_overrides() {
        temp_env::with_vars(
            [
                ("BUFFER_CAPACITY", Some("64")),
                ("BUFFER_MAX_BATCH_SIZE", Some("8")),
                ("BUFFER_MAX_WAIT_MS", Some("10")),
                ("DRAIN_WORKERS", Some("4")),
            ],
            || {
                let config = IngestConfig::from_env().unwrap();
                assert_eq!(config.buffer_capacity, 64);
                assert_eq!(config.max_batch_size, 8);
                assert_eq!(config.max_wait, Duration::from_millis(10));
                assert_eq!(config.drain_workers, 4);
            },
        );
    }

    #[test]
    fn test_ingest_config_rejects_zero_capacity() {
        temp_env::with_var("BUFFER_CAPACITY", Some("0"), || {
            let err = IngestConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("BUFFER_CAPACITY"));
        });
    }

    #[test]
    fn test_ingest_config_rejects_non_numeric() {
        temp_env::with_var("DRAIN_MAX_ATTEMPTS", Some("many"), || {
            let err = IngestConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("DRAIN_MAX_ATTEMPTS"));
        });
    }

    #[test]
    fn test_aggregation_config_event_log_path() {
        temp_env::with_vars(
            [
                ("EVENT_LOG_PATH", Some("/var/lib/events/log.jsonl")),
                ("SEEN_ID_RETENTION_DAYS", Some("7")),
            ],
            || {
                let config = AggregationConfig::from_env().unwrap();
                assert_eq!(
                    config.event_log_path,
                    Some(PathBuf::from("/var/lib/events/log.jsonl"))
                );
                assert_eq!(config.seen_id_retention_days, 7);
                assert_eq!(config.max_query_days, 366);
            },
        );
    }
}
