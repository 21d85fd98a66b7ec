//! Admin handlers for the ingestion buffer.
//!
//! - Prometheus metrics (`/metrics`)
//! - Buffer and sink counters (`/admin/buffer`)
//! - DLQ admin endpoints (`/admin/dlq/*`)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::buffer::IngestBuffer;
use crate::dlq::DeadLetterList;
use crate::error::BufferError;
use crate::metrics;
use crate::worker::BatchSink;

type AdminError = (StatusCode, Json<Value>);

/// Shared state for admin endpoints.
pub struct AdminState<T, S> {
    pub buffer: Arc<IngestBuffer<T>>,
    pub dlq: Arc<DeadLetterList<T>>,
    pub sink: Arc<S>,
}

impl<T, S> AdminState<T, S> {
    pub fn new(buffer: Arc<IngestBuffer<T>>, dlq: Arc<DeadLetterList<T>>, sink: Arc<S>) -> Self {
        Self { buffer, dlq, sink }
    }
}

impl<T, S> Clone for AdminState<T, S> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            dlq: self.dlq.clone(),
            sink: self.sink.clone(),
        }
    }
}

/// Prometheus metrics endpoint handler.
///
/// Returns metrics in Prometheus text format for scraping.
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::prometheus_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Metrics not initialized. Call metrics::init_metrics() at startup.".to_string(),
        )
            .into_response(),
    }
}

/// `GET /admin/buffer`
pub async fn buffer_stats_handler<T, S>(State(state): State<AdminState<T, S>>) -> Json<Value>
where
    S: BatchSink<T>,
{
    Json(json!({
        "buffer": state.buffer.stats(),
        "dlq": state.dlq.stats(),
        "sink": {
            "name": state.sink.name(),
            "stats": state.sink.stats(),
        },
    }))
}

// ============================================================================
// DLQ Admin Handlers
// ============================================================================

/// Query parameters for DLQ list endpoint.
#[derive(Debug, Deserialize)]
pub struct DlqListParams {
    /// Maximum number of entries to return (default: 10, max: 100)
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Number of entries to skip for pagination (default: 0)
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    10
}

fn parse_id(raw: &str) -> Result<Uuid, AdminError> {
    Uuid::parse_str(raw).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid DLQ entry id", "dlq_id": raw })),
        )
    })
}

fn not_found(id: Uuid) -> AdminError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": BufferError::NotFound(id.to_string()).to_string(),
            "dlq_id": id
        })),
    )
}

/// `GET /admin/dlq/stats`
pub async fn dlq_stats_handler<T, S>(State(state): State<AdminState<T, S>>) -> impl IntoResponse {
    Json(state.dlq.stats())
}

/// List DLQ entries, oldest first.
///
/// `GET /admin/dlq/entries?limit=10&offset=0`
pub async fn dlq_list_handler<T, S>(
    State(state): State<AdminState<T, S>>,
    Query(params): Query<DlqListParams>,
) -> Json<Value>
where
    T: Serialize + Clone,
{
    // Cap limit at 100
    let limit = params.limit.min(100);
    let entries = state.dlq.list(limit, params.offset);

    Json(json!({
        "entries": entries,
        "limit": limit,
        "offset": params.offset,
        "count": entries.len(),
        "total": state.dlq.len(),
    }))
}

/// `GET /admin/dlq/entries/{id}`
pub async fn dlq_get_handler<T, S>(
    State(state): State<AdminState<T, S>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, AdminError>
where
    T: Serialize + Clone,
{
    let id = parse_id(&raw_id)?;
    match state.dlq.get(id) {
        Some(entry) => Ok(Json(json!(entry))),
        None => Err(not_found(id)),
    }
}

/// Requeue a single entry back into the buffer.
///
/// Subject to the same capacity check as any submission; on failure the
/// entry stays in the DLQ.
///
/// `POST /admin/dlq/{id}/requeue`
pub async fn dlq_requeue_handler<T, S>(
    State(state): State<AdminState<T, S>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, AdminError>
where
    T: Clone,
{
    let id = parse_id(&raw_id)?;
    let entry = state.dlq.take(id).ok_or_else(|| not_found(id))?;

    match state.buffer.submit(entry.batch.clone()) {
        Ok(count) => {
            info!(dlq_id = %id, items = count, "Requeued DLQ entry");
            Ok(Json(json!({
                "success": true,
                "dlq_id": id,
                "requeued": count,
            })))
        }
        Err(e) => {
            state.dlq.restore(entry);
            let status = match e {
                BufferError::Full { .. } => StatusCode::TOO_MANY_REQUESTS,
                BufferError::Closed => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((
                status,
                Json(json!({ "error": e.to_string(), "dlq_id": id })),
            ))
        }
    }
}

/// Delete a single entry from the DLQ.
///
/// `DELETE /admin/dlq/{id}`
pub async fn dlq_delete_handler<T, S>(
    State(state): State<AdminState<T, S>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let id = parse_id(&raw_id)?;
    if state.dlq.delete(id) {
        Ok(Json(json!({ "success": true, "dlq_id": id })))
    } else {
        Err(not_found(id))
    }
}

/// Delete all entries from the DLQ.
///
/// `DELETE /admin/dlq`
pub async fn dlq_purge_handler<T, S>(State(state): State<AdminState<T, S>>) -> Json<Value> {
    let count = state.dlq.purge();
    Json(json!({ "success": true, "purged_count": count }))
}

/// Create a router with metrics, buffer stats, and DLQ admin endpoints:
/// - `GET /metrics` - Prometheus metrics
/// - `GET /admin/buffer` - Buffer, DLQ and sink counters
/// - `GET /admin/dlq/stats` - DLQ statistics
/// - `GET /admin/dlq/entries` - List DLQ entries
/// - `GET /admin/dlq/entries/{id}` - Single DLQ entry
/// - `POST /admin/dlq/{id}/requeue` - Requeue an entry
/// - `DELETE /admin/dlq/{id}` - Delete an entry
/// - `DELETE /admin/dlq` - Purge the DLQ
pub fn admin_router<T, S>(state: AdminState<T, S>) -> Router
where
    T: Serialize + Clone + Send + Sync + 'static,
    S: BatchSink<T> + 'static,
{
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/admin/buffer", get(buffer_stats_handler::<T, S>))
        .route("/admin/dlq/stats", get(dlq_stats_handler::<T, S>))
        .route("/admin/dlq/entries", get(dlq_list_handler::<T, S>))
        .route("/admin/dlq/entries/{id}", get(dlq_get_handler::<T, S>))
        .route("/admin/dlq/{id}/requeue", post(dlq_requeue_handler::<T, S>))
        .route("/admin/dlq/{id}", delete(dlq_delete_handler::<T, S>))
        .route("/admin/dlq", delete(dlq_purge_handler::<T, S>))
        .with_state(state)
}
