use super::shutdown::ShutdownCoordinator;
use crate::errors::handlers::not_found;
use axum::Router;
use core_config::server::ServerConfig;
use std::io;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Combines domain routes with documentation and cross-cutting layers.
///
/// This sets up:
/// - Swagger UI at `/docs`, serving the document at `/api-docs/openapi.json`
/// - The given routes at the root (state already applied)
/// - Request tracing and the supplied CORS layer
/// - 404 fallback handler
///
/// Health and admin routes are merged by the caller.
///
/// # Example
/// ```ignore
/// use axum_helpers::{create_router, http::cors_layer_from_origins};
///
/// let cors = cors_layer_from_origins(config.cors_allowed_origin.as_deref())?;
/// let router = create_router::<ApiDoc>(api_routes, cors);
/// ```
pub fn create_router<T>(apis: Router, cors_layer: CorsLayer) -> Router
where
    T: OpenApi + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", T::openapi()))
        .merge(apis)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer)
}

/// Production server with coordinated shutdown and cleanup.
///
/// On SIGINT/SIGTERM (or a programmatic [`ShutdownCoordinator::shutdown`]) the
/// listener stops accepting connections and `cleanup` runs, bounded by
/// `server_config.shutdown_timeout`. Returns once both have finished.
///
/// # Example
/// ```ignore
/// let (coordinator, _rx) = ShutdownCoordinator::new();
/// let cleanup = async move {
///     buffer.close();
///     drain_handles.join().await;
/// };
///
/// create_production_app(router, &config, coordinator, cleanup).await?;
/// ```
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    coordinator: ShutdownCoordinator,
    cleanup: F,
) -> io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let shutdown_timeout = server_config.shutdown_timeout;

    // Signal listener; flips the coordinator for everyone else.
    let signal_handle = coordinator.clone();
    tokio::spawn(async move {
        signal_handle.wait_for_signal().await;
    });

    let cleanup_handle = spawn_cleanup(&coordinator, cleanup, shutdown_timeout);

    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(coordinated_shutdown(coordinator.clone()))
        .await;

    finish_serve(serve_result, &coordinator, cleanup_handle).await
}

/// Runs `cleanup` once the coordinator flips to shutting down.
fn spawn_cleanup<F>(
    coordinator: &ShutdownCoordinator,
    cleanup: F,
    shutdown_timeout: Duration,
) -> JoinHandle<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let mut cleanup_rx = coordinator.subscribe();
    let cleanup_flag = coordinator.clone();
    tokio::spawn(async move {
        if !cleanup_flag.is_shutting_down() {
            let _ = cleanup_rx.recv().await;
        }
        run_cleanup(cleanup, shutdown_timeout).await;
    })
}

/// Waits for cleanup after the server stopped.
///
/// A server error never went through the coordinator, so it is triggered
/// here; otherwise the cleanup task would wait forever.
async fn finish_serve(
    serve_result: io::Result<()>,
    coordinator: &ShutdownCoordinator,
    cleanup_handle: JoinHandle<()>,
) -> io::Result<()> {
    if let Err(e) = &serve_result {
        tracing::error!("Server encountered an error: {:?}", e);
        coordinator.shutdown();
    }

    cleanup_handle.await.ok();

    serve_result
}

async fn run_cleanup<F>(cleanup: F, shutdown_timeout: Duration)
where
    F: std::future::Future<Output = ()>,
{
    info!("Starting cleanup tasks (timeout: {:?})", shutdown_timeout);
    match tokio::time::timeout(shutdown_timeout, cleanup).await {
        Ok(_) => info!("Cleanup completed successfully"),
        Err(_) => {
            tracing::warn!(
                "Cleanup exceeded timeout of {:?}, forcing shutdown",
                shutdown_timeout
            );
        }
    }
}

/// Completes once the coordinator has been told to shut down.
async fn coordinated_shutdown(coordinator: ShutdownCoordinator) {
    let mut rx = coordinator.subscribe();
    if coordinator.is_shutting_down() {
        return;
    }
    let _ = rx.recv().await;
}
