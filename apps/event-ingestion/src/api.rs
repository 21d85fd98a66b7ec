//! Route composition

use crate::state::AppState;
use axum::Router;
use axum_helpers::{cors_layer_from_origins, create_router, health_router};
use domain_events::{ApiDoc, ExactPresence, events_router};
use ingest_buffer::{AdminState, admin_router};

/// Build the full application router.
///
/// - `POST /events`, `GET /stats/dau`
/// - `GET /health`, `GET /`
/// - `GET /metrics` and the `/admin` buffer and DLQ endpoints
/// - Swagger UI at `/docs`
pub fn routes(state: &AppState) -> std::io::Result<Router> {
    let events = events_router::<ExactPresence>().with_state(state.events.clone());

    let admin = admin_router(AdminState::new(
        state.buffer.clone(),
        state.dlq.clone(),
        state.engine.clone(),
    ));

    let cors = cors_layer_from_origins(state.config.server.cors_allowed_origin.as_deref())?;

    let apis = events.merge(health_router(state.config.app)).merge(admin);

    Ok(create_router::<ApiDoc>(apis, cors))
}
