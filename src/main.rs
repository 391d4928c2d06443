use anyhow::{Context, Result};
use firewatch::api::create_app;
use firewatch::config::FirewatchConfig;
use firewatch::monitor::HazardMonitor;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "firewatch=info".into()),
        )
        .init();

    info!("Firewatch starting...");

    let config_path = std::env::var("FIREWATCH_CONFIG").ok();
    let config = FirewatchConfig::load(config_path.as_deref())?;

    info!(
        config_file = ?config_path,
        bind_address = %config.server.bind_address,
        abs_threshold = config.thresholds.abs_threshold,
        rise_threshold = config.thresholds.rise_threshold,
        window_secs = config.thresholds.window_duration.as_secs_f64(),
        relay_url = ?config.trigger.relay_url,
        default_camera = ?config.trigger.default_camera_id,
        "Configuration loaded"
    );
    if config.admin_token.is_none() {
        warn!("FIREWATCH_ADMIN_TOKEN not set, threshold updates are unrestricted");
    }

    let monitor = Arc::new(HazardMonitor::from_config(&config)?);
    let app = create_app(monitor, config.admin_token.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!(address = %config.server.bind_address, "HTTP API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("Firewatch stopped");

    Ok(())
}
