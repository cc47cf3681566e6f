//! Spotify Web API backend.

use super::{clamp_volume, MusicControl};
use aide_common::{AideError, ErrorKind, ResultEnvelope};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// Tracks returned by a search
const SEARCH_LIMIT: usize = 5;

#[derive(Debug, Clone, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Album {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Track {
    name: String,
    uri: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<Artist>,
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Device {
    volume_percent: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct PlaybackState {
    #[serde(default)]
    is_playing: bool,
    progress_ms: Option<u64>,
    item: Option<Track>,
    device: Option<Device>,
}

/// Track summary handed back to callers
#[derive(Debug, Clone, Serialize)]
pub struct TrackInfo {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub uri: String,
    pub duration_ms: u64,
}

impl From<Track> for TrackInfo {
    fn from(t: Track) -> Self {
        Self {
            artist: t
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            album: t.album.map(|a| a.name).unwrap_or_else(|| "Unknown".to_string()),
            name: t.name,
            uri: t.uri,
            duration_ms: t.duration_ms,
        }
    }
}

pub struct SpotifyClient {
    http: reqwest::Client,
    api: String,
    token: String,
}

impl SpotifyClient {
    pub fn new(api: &str, token: &str, timeout: Duration) -> Result<Self, AideError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AideError::MusicBackend(e.to_string()))?;
        Ok(Self {
            http,
            api: api.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api, path))
            .bearer_auth(&self.token)
    }

    /// Send and turn transport errors or error statuses into a message
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, String> {
        let response = req.send().await.map_err(|e| format!("Spotify request failed: {}", e))?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Spotify API returned {}: {}", status, body);
            return Err(format!("Spotify API returned {}", status));
        }
        Ok(response)
    }

    async fn command(&self, method: Method, path: &str, action: &str, message: &str) -> ResultEnvelope {
        // the player endpoints reject bodiless PUT/POST without a length
        let req = self.request(method, path).header(reqwest::header::CONTENT_LENGTH, 0);
        match self.send(req).await {
            Ok(_) => ResultEnvelope::ok_with(message, json!({ "action": action })),
            Err(e) => ResultEnvelope::failure(ErrorKind::Backend, e),
        }
    }

    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<TrackInfo>, String> {
        let limit = limit.to_string();
        let req = self
            .request(Method::GET, "/search")
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())]);
        let response = self.send(req).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| format!("Invalid search response: {}", e))?;
        Ok(parsed
            .tracks
            .map(|p| p.items)
            .unwrap_or_default()
            .into_iter()
            .map(TrackInfo::from)
            .collect())
    }

    async fn play_uri(&self, uri: &str) -> Result<(), String> {
        let req = self
            .request(Method::PUT, "/me/player/play")
            .json(&json!({ "uris": [uri] }));
        self.send(req).await.map(|_| ())
    }
}

#[async_trait]
impl MusicControl for SpotifyClient {
    async fn play(&self) -> ResultEnvelope {
        self.command(Method::PUT, "/me/player/play", "play", "Playback resumed").await
    }

    async fn pause(&self) -> ResultEnvelope {
        self.command(Method::PUT, "/me/player/pause", "pause", "Playback paused").await
    }

    async fn next(&self) -> ResultEnvelope {
        self.command(Method::POST, "/me/player/next", "next", "Skipped to next track").await
    }

    async fn previous(&self) -> ResultEnvelope {
        self.command(Method::POST, "/me/player/previous", "previous", "Went back to previous track")
            .await
    }

    async fn search(&self, query: &str) -> ResultEnvelope {
        let query = query.trim();
        if query.is_empty() {
            return ResultEnvelope::failure(ErrorKind::InvalidInput, "No search query provided");
        }
        match self.search_tracks(query, SEARCH_LIMIT).await {
            Ok(tracks) if tracks.is_empty() => ResultEnvelope::ok_with(
                format!("No tracks found for '{}'", query),
                json!({ "tracks": [], "count": 0 }),
            ),
            Ok(tracks) => {
                let count = tracks.len();
                ResultEnvelope::ok_with(
                    format!("Found {} tracks for '{}'", count, query),
                    json!({ "tracks": tracks, "count": count }),
                )
            }
            Err(e) => ResultEnvelope::failure(ErrorKind::Backend, e),
        }
    }

    async fn play_by_query(&self, query: &str) -> ResultEnvelope {
        let query = query.trim();
        if query.is_empty() {
            return ResultEnvelope::failure(ErrorKind::InvalidInput, "No search query provided");
        }
        let track = match self.search_tracks(query, 1).await {
            Ok(tracks) => match tracks.into_iter().next() {
                Some(track) => track,
                None => {
                    return ResultEnvelope::failure(ErrorKind::NotFound, format!("Could not find '{}'", query))
                }
            },
            Err(e) => return ResultEnvelope::failure(ErrorKind::Backend, e),
        };

        match self.play_uri(&track.uri).await {
            Ok(()) => {
                info!("Playing {} by {}", track.name, track.artist);
                ResultEnvelope::ok_with(
                    format!("Now playing {} by {}", track.name, track.artist),
                    json!({ "track": track, "action": "play_search" }),
                )
            }
            Err(e) => ResultEnvelope::failure(ErrorKind::Backend, e),
        }
    }

    async fn current_playback(&self) -> ResultEnvelope {
        let response = match self.send(self.request(Method::GET, "/me/player")).await {
            Ok(r) => r,
            Err(e) => return ResultEnvelope::failure(ErrorKind::Backend, e),
        };
        if response.status() == StatusCode::NO_CONTENT {
            return ResultEnvelope::ok_with("No active playback", json!({ "is_playing": false }));
        }

        let state: PlaybackState = match response.json().await {
            Ok(s) => s,
            Err(e) => {
                return ResultEnvelope::failure(ErrorKind::Backend, format!("Invalid playback response: {}", e))
            }
        };

        let volume = state.device.and_then(|d| d.volume_percent).unwrap_or(0);
        let progress_ms = state.progress_ms.unwrap_or(0);
        match state.item.map(TrackInfo::from) {
            Some(track) => ResultEnvelope::ok_with(
                format!("{} by {}", track.name, track.artist),
                json!({
                    "is_playing": state.is_playing,
                    "track_name": track.name,
                    "artist": track.artist,
                    "album": track.album,
                    "progress_ms": progress_ms,
                    "duration_ms": track.duration_ms,
                    "volume": volume,
                }),
            ),
            None => ResultEnvelope::ok_with(
                "No track loaded",
                json!({ "is_playing": state.is_playing, "volume": volume }),
            ),
        }
    }

    async fn set_volume(&self, volume: i64) -> ResultEnvelope {
        let volume = clamp_volume(volume);
        let req = self
            .request(Method::PUT, "/me/player/volume")
            .query(&[("volume_percent", volume)])
            .header(reqwest::header::CONTENT_LENGTH, 0);
        match self.send(req).await {
            Ok(_) => ResultEnvelope::ok_with(
                format!("Volume set to {}%", volume),
                json!({ "volume": volume, "action": "volume" }),
            ),
            Err(e) => ResultEnvelope::failure(ErrorKind::Backend, e),
        }
    }
}
