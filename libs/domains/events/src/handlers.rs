//! HTTP handlers for events API

use crate::models::{DauPoint, DauQuery, IngestItemResult};
use crate::presence::PresenceSet;
use crate::service::EventService;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_helpers::{AppError, ErrorResponse};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Events router state
pub type EventsState<S> = Arc<EventService<S>>;

/// Create the events router
pub fn events_router<S: PresenceSet>() -> Router<EventsState<S>> {
    Router::new()
        .route("/events", post(ingest_events::<S>))
        .route("/stats/dau", get(get_dau::<S>))
}

/// Ingest a batch of events
///
/// Each item is echoed back with `status` set to `accepted`, `duplicate`
/// or `rejected`. Accepted events are counted asynchronously.
#[utoipa::path(
    post,
    path = "/events",
    request_body(content = Vec<serde_json::Value>, description = "JSON array of event objects"),
    responses(
        (status = 200, description = "Per-item ingestion results", body = Vec<IngestItemResult>),
        (status = 400, description = "Malformed body or every item rejected", body = ErrorResponse),
        (status = 429, description = "Ingestion buffer full, nothing admitted", body = ErrorResponse),
        (status = 503, description = "Shutting down", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state, body))]
pub async fn ingest_events<S: PresenceSet>(
    State(state): State<EventsState<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Vec<IngestItemResult>>, AppError> {
    let Json(body) = body?;
    let results = state.ingest(body)?;
    Ok(Json(results))
}

/// Daily active users over an inclusive date range
#[utoipa::path(
    get,
    path = "/stats/dau",
    params(
        ("start_date" = String, Query, description = "First day, YYYY-MM-DD"),
        ("end_date" = Option<String>, Query, description = "Last day (inclusive), YYYY-MM-DD; defaults to start_date"),
    ),
    responses(
        (status = 200, description = "One point per day, ascending", body = Vec<DauPoint>),
        (status = 400, description = "Malformed date or invalid range", body = ErrorResponse)
    ),
    tag = "stats"
)]
#[instrument(skip(state))]
pub async fn get_dau<S: PresenceSet>(
    State(state): State<EventsState<S>>,
    query: Result<Query<DauQuery>, QueryRejection>,
) -> Result<Json<Vec<DauPoint>>, AppError> {
    let Query(query) = query?;
    let points = state.get_dau(&query.start_date, query.end_date.as_deref())?;
    Ok(Json(points))
}
