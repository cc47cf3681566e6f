//! Music control with two interchangeable backends.
//!
//! The rich backend talks to the Spotify Web API; the minimal backend
//! simulates media keys. Which one is active is decided once, when the
//! backend is built, and never re-probed: a session sees one consistent
//! capability set from start to finish.

pub mod minimal;
pub mod rich;

use crate::config::MusicConfig;
use aide_common::ResultEnvelope;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub use minimal::{KeySender, MediaKey, MinimalBackend, RecordingKeys, XdotoolKeys};
pub use rich::SpotifyClient;

/// Backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Rich,
    Minimal,
}

impl std::fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rich => write!(f, "spotify"),
            Self::Minimal => write!(f, "media-keys"),
        }
    }
}

/// Capability surface shared by both backends.
///
/// The minimal backend answers `search`, `play_by_query` and
/// `current_playback` with `Unsupported`.
#[async_trait]
pub trait MusicControl: Send + Sync {
    async fn play(&self) -> ResultEnvelope;
    async fn pause(&self) -> ResultEnvelope;
    async fn next(&self) -> ResultEnvelope;
    async fn previous(&self) -> ResultEnvelope;
    async fn search(&self, query: &str) -> ResultEnvelope;
    async fn play_by_query(&self, query: &str) -> ResultEnvelope;
    async fn current_playback(&self) -> ResultEnvelope;
    /// `volume` is clamped into 0..=100 before it is applied
    async fn set_volume(&self, volume: i64) -> ResultEnvelope;
}

/// The active backend plus the choice that produced it
pub struct MusicBackend {
    choice: BackendChoice,
    control: Box<dyn MusicControl>,
}

impl MusicBackend {
    /// Probe for Spotify credentials once and build the matching backend
    pub fn select(config: &MusicConfig, keys: Arc<dyn KeySender>) -> Self {
        let token = config
            .spotify_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        if let Some(token) = token {
            let timeout = Duration::from_secs(config.request_timeout_secs);
            match SpotifyClient::new(&config.spotify_api, token, timeout) {
                Ok(client) => {
                    info!("Music control: Spotify API");
                    return Self::rich(client);
                }
                Err(e) => warn!("Spotify client unavailable, using media keys: {}", e),
            }
        } else {
            info!("Spotify credentials not found, music control: media keys");
        }

        Self::minimal(MinimalBackend::from_config(config, keys))
    }

    pub fn rich(client: SpotifyClient) -> Self {
        Self {
            choice: BackendChoice::Rich,
            control: Box::new(client),
        }
    }

    pub fn minimal(backend: MinimalBackend) -> Self {
        Self {
            choice: BackendChoice::Minimal,
            control: Box::new(backend),
        }
    }

    pub fn choice(&self) -> BackendChoice {
        self.choice
    }

    pub fn control(&self) -> &dyn MusicControl {
        self.control.as_ref()
    }
}

/// Clamp any integer into the 0..=100 volume range
pub fn clamp_volume(volume: i64) -> u8 {
    volume.clamp(0, 100) as u8
}

/// Parse "80", "80%", " 42.6 " into an integer volume
pub fn parse_volume(raw: &str) -> Option<i64> {
    let text = raw.trim().trim_end_matches('%').trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    })
}
