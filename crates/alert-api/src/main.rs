//! Alert API - GPU price alert service
//!
//! Accepts alert subscriptions and runs the alert job, either on request
//! from an external scheduler or on its own daily schedule.

use alert_api::{schedule, serve, AlertApiConfig, AppState};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting alert-api");

    let config = AlertApiConfig::load()?;
    info!(
        feed = %config.gpu_data_url,
        store_configured = config.kv_rest_api_url.is_some(),
        email_configured = config.resend_api_key.is_some(),
        "Alert API configured"
    );

    let state = Arc::new(AppState::from_config(&config)?);
    state.register_components().await;
    state.logger.log_startup(SERVICE_VERSION, config.api_port);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let schedule_handle = if config.alert_schedule_enabled {
        Some(tokio::spawn(schedule::run_daily(
            state.clone(),
            config.alert_schedule_hour_utc,
            shutdown_tx.subscribe(),
        )))
    } else {
        None
    };

    state.health_registry.set_ready(true).await;

    let mut server_shutdown = shutdown_tx.subscribe();
    let server = tokio::spawn(serve(config.api_port, state.clone(), async move {
        let _ = server_shutdown.recv().await;
    }));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    state.logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());

    if let Some(handle) = schedule_handle {
        let _ = handle.await;
    }
    server.await??;

    info!("Shutdown complete");
    Ok(())
}
