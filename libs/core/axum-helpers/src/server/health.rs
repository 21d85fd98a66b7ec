use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use core_config::AppInfo;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

/// Service identity returned at `/`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RootResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub docs: &'static str,
}

/// Health check endpoint handler.
///
/// Always returns 200 while the process is serving; it does not touch the
/// ingestion pipeline.
pub async fn health_handler(State(app): State<AppInfo>) -> Response {
    let response = HealthResponse {
        status: "healthy",
        name: app.name,
        version: app.version,
    };

    (StatusCode::OK, Json(response)).into_response()
}

pub async fn root_handler(State(app): State<AppInfo>) -> Json<RootResponse> {
    Json(RootResponse {
        name: app.name,
        version: app.version,
        docs: "/docs",
    })
}

/// Creates a router with the `/health` and `/` endpoints.
///
/// # Example
/// ```ignore
/// use axum_helpers::server::health_router;
/// use core_config::app_info;
///
/// let app = Router::new().merge(health_router(app_info!()));
/// ```
pub fn health_router(app_info: AppInfo) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(root_handler))
        .with_state(app_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const INFO: AppInfo = AppInfo {
        name: "event-ingestion",
        version: "0.1.0",
    };

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = health_router(INFO)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_healthy() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], "0.1.0");
    }

    #[tokio::test]
    async fn test_root_points_at_docs() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "event-ingestion");
        assert_eq!(body["docs"], "/docs");
    }
}
