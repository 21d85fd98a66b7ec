//! Server infrastructure module.
//!
//! This module provides:
//! - Router setup with OpenAPI documentation
//! - Health and service info endpoints
//! - Graceful shutdown coordination
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{create_production_app, create_router, health_router};
//! use core_config::app_info;
//!
//! let router = create_router::<ApiDoc>(api_routes, cors).merge(health_router(app_info!()));
//! create_production_app(router, &server_config, coordinator, cleanup).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_production_app, create_router};
pub use health::{HealthResponse, RootResponse, health_router};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
