//! Aggregation engine properties
//!
//! Idempotence, commutativity, range correctness and concurrency, plus an
//! end-to-end run through the ingestion buffer and drain workers.

use domain_events::*;
use ingest_buffer::{BufferConfig, DeadLetterList, IngestBuffer, spawn_drain_workers};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{TestDataBuilder, date};
use tokio::sync::watch;

fn memory_engine() -> Arc<AggregationEngine> {
    Arc::new(AggregationEngine::new(Arc::new(MemoryEventLog::new())))
}

fn records(payloads: &[Value]) -> Vec<EventRecord> {
    payloads.iter().map(|p| normalize(p).unwrap()).collect()
}

#[tokio::test]
async fn test_ingest_is_idempotent() {
    let builder = TestDataBuilder::from_test_name("idempotent");
    let batch = records(&builder.distinct_users_on(date("2024-01-01"), 5));
    let engine = memory_engine();

    let first = engine.ingest(&batch).await.unwrap();
    let before = engine.query_dau(date("2024-01-01"), None).unwrap();
    let second = engine.ingest(&batch).await.unwrap();
    let after = engine.query_dau(date("2024-01-01"), None).unwrap();

    assert_eq!(first.applied, 5);
    assert_eq!(second.applied, 0);
    assert_eq!(second.duplicates, 5);
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_ingest_order_does_not_matter() {
    let builder = TestDataBuilder::from_test_name("commutative");
    let a = builder.event(1, "alice", "2024-01-01T01:00:00Z");
    let b = builder.event(2, "bob", "2024-01-01T23:59:59Z");
    let c = builder.event(3, "alice", "2024-01-02T00:00:00Z");
    let d = builder.event(1, "alice", "2024-01-01T01:00:00Z");

    let forward = memory_engine();
    forward.ingest(&records(&[a.clone(), b.clone()])).await.unwrap();
    forward.ingest(&records(&[c.clone(), d.clone()])).await.unwrap();

    let backward = memory_engine();
    backward.ingest(&records(&[d, c])).await.unwrap();
    backward.ingest(&records(&[b, a])).await.unwrap();

    let range = (date("2024-01-01"), Some(date("2024-01-02")));
    assert_eq!(
        forward.query_dau(range.0, range.1).unwrap(),
        backward.query_dau(range.0, range.1).unwrap()
    );
    assert_eq!(forward.query_dau(range.0, range.1).unwrap()[0].count, 2);
}

#[tokio::test]
async fn test_range_reports_zero_days() {
    let builder = TestDataBuilder::from_test_name("range");
    let engine = memory_engine();
    engine
        .ingest(&records(&[
            builder.event(1, "u1", "2024-01-01T10:00:00Z"),
            builder.event(2, "u1", "2024-01-03T10:00:00Z"),
        ]))
        .await
        .unwrap();

    let counts: Vec<(String, u64)> = engine
        .query_dau(date("2024-01-01"), Some(date("2024-01-03")))
        .unwrap()
        .into_iter()
        .map(|p| (p.date.to_string(), p.count))
        .collect();

    assert_eq!(
        counts,
        vec![
            ("2024-01-01".to_string(), 1),
            ("2024-01-02".to_string(), 0),
            ("2024-01-03".to_string(), 1),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingests_into_one_day() {
    const N: u64 = 200;
    let builder = Arc::new(TestDataBuilder::from_test_name("concurrent"));
    let engine = memory_engine();

    let mut tasks = Vec::new();
    for n in 0..N {
        let engine = engine.clone();
        let builder = builder.clone();
        tasks.push(tokio::spawn(async move {
            let payload = builder.event(n, &builder.user_id(n), "2024-05-05T12:00:00Z");
            engine.ingest(&records(&[payload])).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let points = engine.query_dau(date("2024-05-05"), None).unwrap();
    assert_eq!(points[0].count, N);
    assert_eq!(engine.stats().seen_ids, N as usize);
}

#[tokio::test]
async fn test_jsonl_log_restores_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let builder = TestDataBuilder::from_test_name("restart");
    let batch = records(&builder.distinct_users_on(date("2024-03-01"), 3));

    {
        let log = Arc::new(JsonlEventLog::open(&path).await.unwrap());
        let engine: AggregationEngine = AggregationEngine::new(log);
        engine.ingest(&batch).await.unwrap();
    }

    let log = Arc::new(JsonlEventLog::open(&path).await.unwrap());
    let engine: AggregationEngine = AggregationEngine::new(log);
    let report = engine.restore_from_log(None).await.unwrap();

    assert_eq!(report.applied, 3);
    assert_eq!(engine.query_dau(date("2024-03-01"), None).unwrap()[0].count, 3);
    // Replayed ids are deduplicated again
    assert_eq!(engine.ingest(&batch).await.unwrap().duplicates, 3);
}

#[tokio::test]
async fn test_drain_workers_feed_engine() {
    let builder = TestDataBuilder::from_test_name("drain_e2e");
    let engine = memory_engine();
    let config = BufferConfig::new("e2e", 100)
        .with_max_batch_size(4)
        .with_max_wait(Duration::from_millis(10))
        .with_workers(2);
    let buffer = Arc::new(IngestBuffer::new(&config.name, config.capacity));
    let dlq = Arc::new(DeadLetterList::new(&config.name, config.dlq_max_length));
    let service = EventService::new(engine.clone(), buffer.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = spawn_drain_workers(
        buffer.clone(),
        dlq.clone(),
        engine.clone(),
        &config,
        shutdown_rx,
    );

    let mut payloads = builder.distinct_users_on(date("2024-01-01"), 10);
    let mut invalid = builder.event(99, "ghost", "2024-01-01T00:00:00Z");
    invalid.as_object_mut().unwrap().remove("user_id");
    payloads.push(invalid);

    let results = service.ingest(Value::Array(payloads)).unwrap();
    assert_eq!(results.len(), 11);
    assert_eq!(results[10].status, IngestStatus::Rejected);

    shutdown_tx.send(true).unwrap();
    while workers.join_next().await.is_some() {}

    assert_eq!(buffer.outstanding(), 0);
    assert!(dlq.is_empty());
    assert_eq!(engine.query_dau(date("2024-01-01"), None).unwrap()[0].count, 10);
    // The rejected item never reached the engine
    assert!(!engine.is_seen(&builder.event_id(99)));
}

#[tokio::test]
async fn test_restart_after_retention_pass_stays_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let builder = TestDataBuilder::from_test_name("retention_restart");
    let old_day = date("2020-01-01");
    let cutoff = date("2024-01-01");

    // 500 events from 5 users, all long past the retention window
    let payloads: Vec<Value> = (0..500)
        .map(|n| builder.event(n, &builder.user_id(n % 5), "2020-01-01T08:00:00Z"))
        .collect();

    {
        let log = Arc::new(JsonlEventLog::open(&path).await.unwrap());
        let engine: AggregationEngine = AggregationEngine::new(log);
        engine.ingest(&records(&payloads)).await.unwrap();

        let report = engine.compact_before(cutoff).await.unwrap();
        assert_eq!(report.evicted_ids, 500);
        assert_eq!(report.compacted_records, 495);
        assert_eq!(engine.stats().seen_ids, 0);
    }

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(contents.lines().count(), 5);

    let log = Arc::new(JsonlEventLog::open(&path).await.unwrap());
    let engine: AggregationEngine = AggregationEngine::new(log);
    engine.restore_from_log(Some(cutoff)).await.unwrap();

    assert_eq!(engine.stats().seen_ids, 0);
    assert_eq!(engine.query_dau(old_day, None).unwrap()[0].count, 5);
}
