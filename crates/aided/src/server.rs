//! HTTP server for aided

use crate::monitor::Monitor;
use crate::routes;
use crate::session::Session;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub session: Arc<Session>,
    pub monitor: Arc<Monitor>,
    /// Interval used when /monitor/start does not name one
    pub monitor_interval: Duration,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(session: Arc<Session>, monitor: Arc<Monitor>, monitor_interval: Duration) -> Self {
        Self {
            session,
            monitor,
            monitor_interval,
            start_time: Instant::now(),
        }
    }
}

/// Router with every endpoint mounted
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::chat_routes())
        .merge(routes::system_routes())
        .merge(routes::memory_routes())
        .merge(routes::monitor_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until it fails
pub async fn run(state: AppState, bind: &str) -> Result<()> {
    let app = app(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
