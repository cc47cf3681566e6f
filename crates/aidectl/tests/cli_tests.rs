//! aidectl Tests
//!
//! Parameter parsing and the HTTP client against a small stand-in daemon.

use aide_common::{ErrorKind, MonitorState, ResultEnvelope};
use aidectl::client::AideClient;
use aidectl::commands::{envelope_tag, format_uptime};
use aidectl::params::parse_params;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_parse_params() {
    let params = parse_params(&["file_path=notes.txt", "content=a=b", "mode="]).unwrap();
    assert_eq!(params["file_path"], "notes.txt");
    assert_eq!(params["content"], "a=b");
    assert_eq!(params["mode"], "");
}

#[test]
fn test_parse_params_rejects_malformed() {
    assert!(parse_params(&["file_path"]).is_err());
    assert!(parse_params(&["=value"]).is_err());
    assert!(parse_params::<&str>(&[]).unwrap().is_empty());
}

#[test]
fn test_format_uptime() {
    assert_eq!(format_uptime(0), "00:00:00");
    assert_eq!(format_uptime(3_725), "01:02:05");
    assert_eq!(format_uptime(90_061), "1d 01:01:01");
}

#[test]
fn test_envelope_tag() {
    assert_eq!(envelope_tag(&ResultEnvelope::ok("done")), "[OK]");
    assert_eq!(
        envelope_tag(&ResultEnvelope::failure(ErrorKind::AccessDenied, "no")),
        "[ACCESS_DENIED]"
    );
}

// ============================================================================
// Client
// ============================================================================

async fn echo_execute(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": format!("ran {}", body["action"].as_str().unwrap_or("")),
        "data": body["params"].clone()
    }))
}

async fn spawn_daemon() -> String {
    let app = Router::new()
        .route(
            "/health",
            get(|| async {
                Json(json!({
                    "status": "online",
                    "version": "0.1.0",
                    "music_backend": "media-keys",
                    "monitor": "stopped",
                    "action_set_version": 1,
                    "uptime_secs": 42
                }))
            }),
        )
        .route("/system/execute", post(echo_execute))
        .route("/monitor/latest", get(|| async { (StatusCode::NOT_FOUND, "none") }))
        .route("/chat", post(|| async { (StatusCode::BAD_REQUEST, "No message provided") }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_client_health_and_execute() {
    let client = AideClient::new(&spawn_daemon().await).unwrap();

    let health = client.health().await.unwrap();
    assert_eq!(health.monitor, MonitorState::Stopped);
    assert_eq!(health.uptime_secs, 42);

    let params = parse_params(&["file_path=a.txt"]).unwrap();
    let env = client.execute("read_file", params).await.unwrap();
    assert_eq!(env.message(), Some("ran read_file"));
    assert_eq!(env.data().unwrap()["file_path"], "a.txt");
}

#[tokio::test]
async fn test_client_maps_statuses() {
    let client = AideClient::new(&spawn_daemon().await).unwrap();

    assert!(client.monitor_latest().await.unwrap().is_none());
    let err = client.chat("").await.unwrap_err();
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_unreachable_daemon() {
    let client = AideClient::new("http://127.0.0.1:9").unwrap();
    let err = client.health().await.unwrap_err();
    assert!(err.to_string().contains("not reachable"));
}
