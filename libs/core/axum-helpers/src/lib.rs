//! # Axum Helpers
//!
//! Shared plumbing for the HTTP services in this workspace.
//!
//! ## Modules
//!
//! - **[`server`]**: Router setup, health endpoints, graceful shutdown
//! - **[`http`]**: HTTP middleware (CORS)
//! - **[`errors`]**: Structured error responses with error codes
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::{ShutdownCoordinator, create_production_app, create_router, health_router};
//! use axum_helpers::http::cors_layer_from_origins;
//! use core_config::{app_info, server::ServerConfig};
//! use utoipa::OpenApi;
//!
//! #[derive(OpenApi)]
//! #[openapi(paths())]
//! struct ApiDoc;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = ServerConfig::default();
//!     let cors = cors_layer_from_origins(config.cors_allowed_origin.as_deref())?;
//!     let router = create_router::<ApiDoc>(Router::new(), cors).merge(health_router(app_info!()));
//!
//!     let (coordinator, _rx) = ShutdownCoordinator::new();
//!     create_production_app(router, &config, coordinator, async {}).await
//! }
//! ```

pub mod errors;
pub mod http;
pub mod server;

// Re-export server types
pub use server::{
    HealthResponse, RootResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, shutdown_signal,
};

// Re-export HTTP middleware
pub use http::{cors_layer_from_origins, create_cors_layer, create_permissive_cors_layer};

// Re-export error types
pub use errors::{AppError, ErrorCode, ErrorResponse};
