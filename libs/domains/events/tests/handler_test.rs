//! Handler tests for the events domain
//!
//! These drive `events_router` with `oneshot` and check:
//! - per-item statuses echoed by `POST /events`
//! - HTTP status codes for malformed bodies, backpressure and shutdown
//! - the DAU series returned by `GET /stats/dau`

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain_events::*;
use http_body_util::BodyExt;
use ingest_buffer::IngestBuffer;
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::assertions::assert_dau_counts;
use test_utils::{TestDataBuilder, date};
use tower::ServiceExt; // For oneshot()

struct Harness {
    engine: Arc<AggregationEngine>,
    buffer: Arc<IngestBuffer<EventRecord>>,
    app: Router,
}

impl Harness {
    fn new(capacity: usize) -> Self {
        let engine: Arc<AggregationEngine> =
            Arc::new(AggregationEngine::new(Arc::new(MemoryEventLog::new())));
        let buffer = Arc::new(IngestBuffer::new("handler-test", capacity));
        let service = EventService::new(engine.clone(), buffer.clone()).with_max_query_days(31);
        let app = events_router::<ExactPresence>().with_state(Arc::new(service));
        Self {
            engine,
            buffer,
            app,
        }
    }

    /// Move everything queued into the engine, the way a drain worker would.
    async fn drain(&self) {
        while let Some(batch) = self.buffer.try_take(100) {
            self.engine.ingest(&batch).await.unwrap();
            self.buffer.ack(batch.len());
        }
    }

    async fn post_events(&self, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        send(self.app.clone(), request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(self.app.clone(), request).await
    }
}

// Helper to parse JSON response body
async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    (status, json_body(response.into_body()).await)
}

#[tokio::test]
async fn test_post_events_echoes_statuses() {
    let h = Harness::new(100);
    let builder = TestDataBuilder::from_test_name("post_echo");
    let user = builder.user_id(1);

    let good = builder.event(1, &user, "2024-01-01T09:00:00+02:00");
    let mut missing_user = builder.event(2, &user, "2024-01-01T10:00:00Z");
    missing_user.as_object_mut().unwrap().remove("user_id");

    let (status, body) = h
        .post_events(json!([good.clone(), good, missing_user]))
        .await;

    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items[0]["status"], "accepted");
    assert_eq!(items[0]["occurred_at"], "2024-01-01T07:00:00Z");
    assert_eq!(items[0]["properties"]["seq"], 1);
    assert_eq!(items[1]["status"], "duplicate");
    assert_eq!(items[2]["status"], "rejected");
    assert!(items[2]["error"].as_str().unwrap().contains("user_id"));
    assert_eq!(items[2]["event_id"], builder.event_id(2).to_string());
}

#[tokio::test]
async fn test_resubmitting_applied_event_is_duplicate() {
    let h = Harness::new(100);
    let builder = TestDataBuilder::from_test_name("resubmit");
    let event = builder.event(1, &builder.user_id(1), "2024-01-01T10:00:00Z");

    h.post_events(json!([event.clone()])).await;
    h.drain().await;

    let (status, body) = h.post_events(json!([event])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["status"], "duplicate");
    assert_eq!(h.buffer.queued(), 0);
}

#[tokio::test]
async fn test_malformed_bodies_return_400() {
    let h = Harness::new(100);

    for body in [json!({"event_id": "x"}), json!(["not an object"]), json!(null)] {
        let (status, response) = h.post_events(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "VALIDATION_ERROR");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json")
        .body(Body::from("[{"))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_all_rejected_returns_400_with_items() {
    let h = Harness::new(100);
    let (status, body) = h
        .post_events(json!([{"user_id": "u1"}, {"event_id": "nope"}]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert!(details.iter().all(|d| d["status"] == "rejected"));
}

#[tokio::test]
async fn test_empty_batch_is_accepted() {
    let h = Harness::new(100);
    let (status, body) = h.post_events(json!([])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_full_buffer_returns_429_and_admits_nothing() {
    let h = Harness::new(2);
    let builder = TestDataBuilder::from_test_name("backpressure");
    let events = builder.distinct_users_on(date("2024-01-01"), 3);

    let (status, body) = h.post_events(Value::Array(events)).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "BUFFER_FULL");
    assert_eq!(body["details"]["available"], 2);
    assert_eq!(h.buffer.outstanding(), 0);
}

#[tokio::test]
async fn test_closed_buffer_returns_503() {
    let h = Harness::new(10);
    h.buffer.close();
    let builder = TestDataBuilder::from_test_name("closed");

    let (status, _) = h
        .post_events(json!([builder.event(1, "u", "2024-01-01T00:00:00Z")]))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_dau_range_fills_missing_days() {
    let h = Harness::new(100);
    let builder = TestDataBuilder::from_test_name("dau_range");
    let user = builder.user_id(1);

    h.post_events(json!([
        builder.event(1, &user, "2024-01-01T10:00:00Z"),
        builder.event(2, &user, "2024-01-03T10:00:00Z"),
    ]))
    .await;
    h.drain().await;

    let (status, body) = h
        .get("/stats/dau?start_date=2024-01-01&end_date=2024-01-03")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_dau_counts(
        &body,
        &[("2024-01-01", 1), ("2024-01-02", 0), ("2024-01-03", 1)],
    );
}

#[tokio::test]
async fn test_dau_end_date_defaults_to_start() {
    let h = Harness::new(100);
    let builder = TestDataBuilder::from_test_name("dau_single");
    h.post_events(Value::Array(
        builder.distinct_users_on(date("2024-02-10"), 4),
    ))
    .await;
    h.drain().await;

    let (_, body) = h.get("/stats/dau?start_date=2024-02-10").await;
    assert_dau_counts(&body, &[("2024-02-10", 4)]);
}

#[tokio::test]
async fn test_dau_rejects_bad_input() {
    let h = Harness::new(100);

    let cases = [
        "/stats/dau?start_date=2024-01-03&end_date=2024-01-01",
        "/stats/dau?start_date=01/01/2024",
        "/stats/dau?start_date=2024-01-01&end_date=2024-03-01",
        "/stats/dau",
    ];
    for uri in cases {
        let (status, _) = h.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }

    let (_, body) = h
        .get("/stats/dau?start_date=2024-01-03&end_date=2024-01-01")
        .await;
    assert_eq!(body["error"], "INVALID_RANGE");
}
