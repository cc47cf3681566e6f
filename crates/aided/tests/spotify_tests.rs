//! Spotify Backend Tests
//!
//! Run the rich music backend against a local axum stand-in for the
//! Spotify Web API.

use aide_common::ErrorKind;
use aided::music::{MusicControl, SpotifyClient};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorded {
    calls: Mutex<Vec<String>>,
    playing: Mutex<bool>,
}

type Shared = Arc<Recorded>;

fn track(name: &str, artist: &str) -> Value {
    json!({
        "name": name,
        "uri": format!("spotify:track:{}", name.to_lowercase()),
        "duration_ms": 200000,
        "artists": [{ "name": artist }],
        "album": { "name": "Album" }
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer test-token")
}

async fn play(State(s): State<Shared>, headers: HeaderMap, body: String) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    s.calls.lock().unwrap().push(format!("play {}", body));
    *s.playing.lock().unwrap() = true;
    StatusCode::NO_CONTENT
}

async fn next(State(s): State<Shared>) -> StatusCode {
    s.calls.lock().unwrap().push("next".to_string());
    StatusCode::NO_CONTENT
}

async fn pause() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn search(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let items = match q.get("q").map(String::as_str) {
        Some("nothing") => vec![],
        _ => vec![track("Harder", "Daft Punk"), track("Better", "Daft Punk")],
    };
    assert_eq!(q.get("type").map(String::as_str), Some("track"));
    Json(json!({ "tracks": { "items": items } }))
}

async fn player(State(s): State<Shared>) -> (StatusCode, Json<Value>) {
    if !*s.playing.lock().unwrap() {
        return (StatusCode::NO_CONTENT, Json(Value::Null));
    }
    (
        StatusCode::OK,
        Json(json!({
            "is_playing": true,
            "progress_ms": 1000,
            "item": track("Harder", "Daft Punk"),
            "device": { "volume_percent": 42 }
        })),
    )
}

async fn volume(State(s): State<Shared>, Query(q): Query<HashMap<String, String>>) -> StatusCode {
    s.calls
        .lock()
        .unwrap()
        .push(format!("volume {}", q.get("volume_percent").cloned().unwrap_or_default()));
    StatusCode::NO_CONTENT
}

async fn spawn_api() -> (SpotifyClient, Shared) {
    let shared = Shared::default();
    let app = Router::new()
        .route("/v1/me/player/play", put(play))
        .route("/v1/me/player/pause", put(pause))
        .route("/v1/me/player/next", post(next))
        .route("/v1/me/player", get(player))
        .route("/v1/me/player/volume", put(volume))
        .route("/v1/search", get(search))
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = SpotifyClient::new(&format!("http://{}/v1/", addr), "test-token", Duration::from_secs(5)).unwrap();
    (client, shared)
}

#[tokio::test]
async fn test_play_and_next() {
    let (client, shared) = spawn_api().await;
    assert_eq!(client.play().await.message(), Some("Playback resumed"));
    assert_eq!(client.next().await.message(), Some("Skipped to next track"));
    assert_eq!(shared.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_api_error_is_backend() {
    let (client, _) = spawn_api().await;
    let env = client.pause().await;
    assert_eq!(env.error_kind(), Some(ErrorKind::Backend));
    assert!(env.error_detail().unwrap().contains("404"));
}

#[tokio::test]
async fn test_search_returns_tracks() {
    let (client, _) = spawn_api().await;
    let env = client.search("daft punk").await;
    assert!(env.is_success());
    let data = env.data().unwrap();
    assert_eq!(data["count"], 2);
    assert_eq!(data["tracks"][0]["name"], "Harder");
    assert_eq!(data["tracks"][0]["artist"], "Daft Punk");
    assert_eq!(data["tracks"][0]["album"], "Album");

    assert_eq!(client.search("  ").await.error_kind(), Some(ErrorKind::InvalidInput));
}

#[tokio::test]
async fn test_play_by_query() {
    let (client, shared) = spawn_api().await;
    let env = client.play_by_query("harder").await;
    assert_eq!(env.message(), Some("Now playing Harder by Daft Punk"));
    let calls = shared.calls.lock().unwrap().clone();
    assert!(calls[0].contains("spotify:track:harder"));

    let missing = client.play_by_query("nothing").await;
    assert_eq!(missing.error_kind(), Some(ErrorKind::NotFound));
    assert_eq!(missing.error_detail(), Some("Could not find 'nothing'"));
}

#[tokio::test]
async fn test_current_playback() {
    let (client, _) = spawn_api().await;
    let idle = client.current_playback().await;
    assert_eq!(idle.data().unwrap()["is_playing"], false);

    client.play().await;
    let env = client.current_playback().await;
    let data = env.data().unwrap();
    assert_eq!(data["is_playing"], true);
    assert_eq!(data["track_name"], "Harder");
    assert_eq!(data["volume"], 42);
}

#[tokio::test]
async fn test_volume_is_clamped_before_request() {
    let (client, shared) = spawn_api().await;
    let env = client.set_volume(180).await;
    assert_eq!(env.message(), Some("Volume set to 100%"));
    client.set_volume(-3).await;
    assert_eq!(*shared.calls.lock().unwrap(), vec!["volume 100", "volume 0"]);
}
