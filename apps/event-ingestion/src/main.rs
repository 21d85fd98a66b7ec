use axum_helpers::server::{ShutdownCoordinator, create_production_app};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_events::RetentionSweeper;
use ingest_buffer::{init_metrics, spawn_drain_workers};
use tokio::sync::watch;
use tracing::info;

mod api;
mod config;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    init_metrics().map_err(|e| eyre::eyre!("Failed to install metrics recorder: {}", e))?;

    // Engine, buffer, DLQ and service; replays the event log if one is configured
    let state = AppState::new(config).await?;

    // Background tasks share one watch channel for shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut workers = spawn_drain_workers(
        state.buffer.clone(),
        state.dlq.clone(),
        state.engine.clone(),
        &state.buffer_config,
        shutdown_rx.clone(),
    );
    info!(
        workers = state.buffer_config.workers,
        capacity = state.buffer_config.capacity,
        "Drain workers started"
    );

    let sweeper = tokio::spawn(
        RetentionSweeper::new(
            state.engine.clone(),
            state.config.aggregation.seen_id_retention_days,
            state.config.aggregation.retention_sweep_interval,
        )
        .run(shutdown_rx),
    );

    let app = api::routes(&state)?;

    let (coordinator, _shutdown_rx) = ShutdownCoordinator::new();

    info!(
        "Starting event ingestion service ({:?} shutdown timeout)",
        state.config.server.shutdown_timeout
    );

    let server_config = state.config.server.clone();
    create_production_app(app, &server_config, coordinator, async move {
        info!("Shutting down: closing ingestion buffer and draining queued events");

        // New submissions now get 503; workers drain what is left, then exit.
        state.buffer.close();
        let _ = shutdown_tx.send(true);

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Drain worker panicked: {}", e);
            }
        }
        let _ = sweeper.await;

        let stats = state.buffer.stats();
        info!(
            outstanding = stats.outstanding,
            dead_lettered = state.dlq.len(),
            engine = ?state.engine.stats(),
            "Ingestion pipeline stopped"
        );
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Event ingestion service shutdown complete");
    Ok(())
}
