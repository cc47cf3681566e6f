//! Aide Daemon - natural-language desktop assistant

use aided::bootstrap::{build_state, Adapters};
use aided::config::Config;
use aided::server;
use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Aide Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load();
    let adapters = Adapters::from_config(&config)?;
    if config.oracle.api_key.is_none() {
        warn!("No oracle API key configured, chat turns will fail until AIDE_ORACLE_API_KEY is set");
    }

    let state = build_state(&config, adapters);
    info!("Music control: {}", state.session.dispatcher().music_backend());

    if config.monitor.autostart {
        state
            .monitor
            .start(Duration::from_secs(config.monitor.interval_secs.max(1)))
            .await;
    }

    let monitor = state.monitor.clone();
    tokio::select! {
        result = server::run(state, &config.server.bind) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    monitor.stop().await;
    info!("Aide Daemon stopped");
    Ok(())
}
