use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use fleet_report_core::app_state::build_app_state;
use fleet_report_core::config::AppConfig;
use fleet_report_core::debug::run_debug;
use fleet_report_core::logging::init_logging;
use fleet_report_core::routes::app_router;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    // keep the guard alive so file logs are flushed on exit
    let _log_guard = init_logging(&config)?;

    let state = build_app_state(config.clone())?;

    if config.debug_mode {
        run_debug(&state).await;
        return Ok(());
    }

    let app = app_router().with_state(state);
    let listener = TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server_addr))?;
    info!("🚀 Server started on {}", config.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
