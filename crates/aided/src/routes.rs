//! API routes for aided

use crate::server::AppState;
use aide_common::{
    ChatRequest, ExecuteRequest, HealthResponse, HistoryResponse, MonitorSnapshot, MonitorStartRequest,
    MonitorStatus, ResultEnvelope, TurnReply, ACTION_SET_VERSION, VERSION,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Health
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online".to_string(),
        version: VERSION.to_string(),
        music_backend: state.session.dispatcher().music_backend().to_string(),
        monitor: state.monitor.state(),
        action_set_version: ACTION_SET_VERSION,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Conversation
// ============================================================================

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new().route("/chat", post(chat))
}

async fn chat(
    State(state): State<AppStateArc>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<TurnReply>, (StatusCode, String)> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No message provided".to_string()));
    }
    info!("Chat: {}", message);
    Ok(Json(state.session.handle_turn(message).await))
}

// ============================================================================
// Direct execution
// ============================================================================

pub fn system_routes() -> Router<AppStateArc> {
    Router::new().route("/system/execute", post(execute))
}

async fn execute(
    State(state): State<AppStateArc>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ResultEnvelope>, (StatusCode, String)> {
    let action = req.action.trim();
    if action.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No action specified".to_string()));
    }
    Ok(Json(state.session.direct_dispatch(action, &req.params).await))
}

// ============================================================================
// Memory
// ============================================================================

pub fn memory_routes() -> Router<AppStateArc> {
    Router::new().route("/memory", get(history).delete(forget))
}

async fn history(State(state): State<AppStateArc>) -> Json<HistoryResponse> {
    let (capacity, entries) = state.session.history().await;
    Json(HistoryResponse { capacity, entries })
}

async fn forget(State(state): State<AppStateArc>) -> Json<ResultEnvelope> {
    state.session.forget().await;
    Json(ResultEnvelope::ok("Conversation memory cleared"))
}

// ============================================================================
// Monitor
// ============================================================================

pub fn monitor_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/monitor/start", post(monitor_start))
        .route("/monitor/stop", post(monitor_stop))
        .route("/monitor/status", get(monitor_status))
        .route("/monitor/latest", get(monitor_latest))
}

async fn monitor_start(
    State(state): State<AppStateArc>,
    body: Option<Json<MonitorStartRequest>>,
) -> Json<MonitorStatus> {
    let interval = body
        .and_then(|Json(req)| req.interval_secs)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(state.monitor_interval);
    state.monitor.start(interval).await;
    Json(state.monitor.status().await)
}

async fn monitor_stop(State(state): State<AppStateArc>) -> Json<MonitorStatus> {
    state.monitor.stop().await;
    Json(state.monitor.status().await)
}

async fn monitor_status(State(state): State<AppStateArc>) -> Json<MonitorStatus> {
    Json(state.monitor.status().await)
}

async fn monitor_latest(
    State(state): State<AppStateArc>,
) -> Result<Json<MonitorSnapshot>, (StatusCode, String)> {
    let log = state.monitor.log().clone();
    let latest = tokio::task::spawn_blocking(move || log.latest())
        .await
        .map_err(|e| {
            error!("Monitor log task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .map_err(|e| {
            error!("Monitor log unreadable: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    latest
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "No monitoring data recorded yet".to_string()))
}
