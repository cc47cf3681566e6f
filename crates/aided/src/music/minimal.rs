//! Media-key backend.
//!
//! Works with whatever player owns the desktop media keys, but can only
//! send keys: no search, no track info. Volume is tracked locally and
//! moved toward the requested level with volume up/down presses.

use super::{clamp_volume, MusicControl};
use crate::config::MusicConfig;
use aide_common::{ErrorKind, ResultEnvelope};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Keys the minimal backend can press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    PlayPause,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
}

impl MediaKey {
    /// X11 keysym
    pub fn keysym(&self) -> &'static str {
        match self {
            Self::PlayPause => "XF86AudioPlay",
            Self::Next => "XF86AudioNext",
            Self::Previous => "XF86AudioPrev",
            Self::VolumeUp => "XF86AudioRaiseVolume",
            Self::VolumeDown => "XF86AudioLowerVolume",
        }
    }
}

/// Something that can press a media key
#[async_trait]
pub trait KeySender: Send + Sync {
    async fn press(&self, key: MediaKey) -> Result<()>;
}

/// Presses keys through `xdotool`
#[derive(Debug, Default)]
pub struct XdotoolKeys;

#[async_trait]
impl KeySender for XdotoolKeys {
    async fn press(&self, key: MediaKey) -> Result<()> {
        let output = Command::new("xdotool")
            .args(["key", key.keysym()])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| anyhow!("xdotool not available: {}", e))?;
        if !output.status.success() {
            return Err(anyhow!(
                "xdotool failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }
}

/// Records presses instead of sending them (headless runs and tests)
#[derive(Debug, Default)]
pub struct RecordingKeys {
    pressed: Mutex<Vec<MediaKey>>,
}

impl RecordingKeys {
    pub fn pressed(&self) -> Vec<MediaKey> {
        self.pressed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl KeySender for RecordingKeys {
    async fn press(&self, key: MediaKey) -> Result<()> {
        self.pressed
            .lock()
            .map_err(|_| anyhow!("key log poisoned"))?
            .push(key);
        Ok(())
    }
}

pub struct MinimalBackend {
    keys: Arc<dyn KeySender>,
    cooldown: Duration,
    last_press: Mutex<Option<Instant>>,
    volume: AtomicU8,
    /// Held while the key steps of one volume change are sent
    adjusting: tokio::sync::Mutex<()>,
    volume_step: u8,
}

impl MinimalBackend {
    pub fn new(keys: Arc<dyn KeySender>, cooldown: Duration, initial_volume: u8, volume_step: u8) -> Self {
        Self {
            keys,
            cooldown,
            last_press: Mutex::new(None),
            volume: AtomicU8::new(initial_volume.min(100)),
            adjusting: tokio::sync::Mutex::new(()),
            volume_step: volume_step.max(1),
        }
    }

    pub fn from_config(config: &MusicConfig, keys: Arc<dyn KeySender>) -> Self {
        Self::new(
            keys,
            Duration::from_millis(config.cooldown_ms),
            config.initial_volume,
            config.volume_step,
        )
    }

    /// Last volume level this backend applied
    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::SeqCst)
    }

    /// True while the cooldown since the last successful press is running
    fn cooling_down(&self) -> bool {
        self.last_press
            .lock()
            .map(|last| (*last).is_some_and(|prev| prev.elapsed() < self.cooldown))
            .unwrap_or(false)
    }

    fn mark_pressed(&self) {
        if let Ok(mut last) = self.last_press.lock() {
            *last = Some(Instant::now());
        }
    }

    async fn tap(&self, key: MediaKey, action: &str, message: &str) -> ResultEnvelope {
        if self.cooling_down() {
            debug!("Media key {:?} suppressed by cooldown", key);
            return ResultEnvelope::ok("Command sent (cooldown active)");
        }
        match self.keys.press(key).await {
            Ok(()) => {
                self.mark_pressed();
                ResultEnvelope::ok_with(message, json!({ "action": action }))
            }
            Err(e) => {
                warn!("Media key {:?} failed: {}", key, e);
                ResultEnvelope::failure(ErrorKind::Backend, e.to_string())
            }
        }
    }

    fn unsupported(what: &str) -> ResultEnvelope {
        ResultEnvelope::failure(
            ErrorKind::Unsupported,
            format!("{} requires the Spotify API; only media keys are available", what),
        )
    }
}

#[async_trait]
impl MusicControl for MinimalBackend {
    // the play/pause key toggles, so play and pause send the same key
    async fn play(&self) -> ResultEnvelope {
        self.tap(MediaKey::PlayPause, "play", "Play/Pause toggled").await
    }

    async fn pause(&self) -> ResultEnvelope {
        self.tap(MediaKey::PlayPause, "pause", "Play/Pause toggled").await
    }

    async fn next(&self) -> ResultEnvelope {
        self.tap(MediaKey::Next, "next", "Skipped to next track").await
    }

    async fn previous(&self) -> ResultEnvelope {
        self.tap(MediaKey::Previous, "previous", "Went back to previous track").await
    }

    async fn search(&self, _query: &str) -> ResultEnvelope {
        Self::unsupported("Search")
    }

    async fn play_by_query(&self, _query: &str) -> ResultEnvelope {
        Self::unsupported("Song selection")
    }

    async fn current_playback(&self) -> ResultEnvelope {
        Self::unsupported("Current track info")
    }

    async fn set_volume(&self, volume: i64) -> ResultEnvelope {
        let target = clamp_volume(volume);
        let _adjusting = self.adjusting.lock().await;
        let current = self.volume();

        let diff = i16::from(target) - i16::from(current);
        let step = i16::from(self.volume_step);
        let presses = (diff.abs() + step / 2) / step;
        let key = if diff > 0 { MediaKey::VolumeUp } else { MediaKey::VolumeDown };

        for _ in 0..presses {
            if let Err(e) = self.keys.press(key).await {
                warn!("Volume key failed: {}", e);
                return ResultEnvelope::failure(ErrorKind::Backend, e.to_string());
            }
        }
        self.volume.store(target, Ordering::SeqCst);

        ResultEnvelope::ok_with(
            format!("Volume set to {}%", target),
            json!({ "volume": target, "presses": presses, "action": "volume" }),
        )
    }
}
