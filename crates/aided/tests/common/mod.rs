//! Shared fixtures for aided integration tests: a sandboxed config and fake adapters.

#![allow(dead_code)]

use aide_common::{AideError, MemoryEntry, MonitorSnapshot, ResourceUsage};
use aided::bootstrap::{build_dispatcher, build_state, Adapters};
use aided::config::Config;
use aided::dispatcher::Dispatcher;
use aided::monitor::SnapshotSource;
use aided::music::RecordingKeys;
use aided::oracle::Oracle;
use aided::server::AppState;
use aided::speech::Speaker;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Config whose base directory, restricted root and monitor log live in a temp dir
pub struct Sandbox {
    pub dir: TempDir,
    pub config: Config,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("home")).unwrap();
        std::fs::create_dir_all(root.join("secret")).unwrap();

        let mut config = Config::default();
        config.paths.base_dir = Some(root.join("home"));
        config
            .paths
            .restricted_roots
            .push(root.join("secret").to_string_lossy().into_owned());
        config.monitor.log_path = root.join("monitoring_data.json");
        config.music.cooldown_ms = 0;
        config.music.spotify_token = None;

        Self { dir, config }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().canonicalize().unwrap()
    }

    pub fn home(&self) -> PathBuf {
        self.root().join("home")
    }

    pub fn dispatcher(&self) -> (Dispatcher, Arc<RecordingKeys>) {
        self.dispatcher_with(Arc::new(FakeSnapshots::default()))
    }

    pub fn dispatcher_with(&self, snapshots: Arc<dyn SnapshotSource>) -> (Dispatcher, Arc<RecordingKeys>) {
        let keys = Arc::new(RecordingKeys::default());
        let dispatcher = build_dispatcher(&self.config, keys.clone(), snapshots);
        (dispatcher, keys)
    }

    pub fn state(&self, oracle: Arc<FakeOracle>) -> AppState {
        build_state(
            &self.config,
            Adapters {
                oracle,
                speaker: Arc::new(RecordingSpeaker::default()),
                keys: Arc::new(RecordingKeys::default()),
                snapshots: Arc::new(FakeSnapshots::default()),
            },
        )
    }
}

/// Oracle that replays scripted answers; an exhausted script is an outage
#[derive(Default)]
pub struct FakeOracle {
    answers: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<(String, Vec<MemoryEntry>)>>,
}

impl FakeOracle {
    pub fn scripted(answers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Oracle for FakeOracle {
    async fn ask(&self, prompt: &str, history: &[MemoryEntry]) -> Result<String, AideError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), history.to_vec()));
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AideError::Oracle("connection refused".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingSpeaker {
    pub spoken: Mutex<Vec<String>>,
}

impl Speaker for RecordingSpeaker {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }
}

/// Deterministic snapshots numbered by capture order
#[derive(Default)]
pub struct FakeSnapshots {
    captured: AtomicUsize,
}

impl FakeSnapshots {
    pub fn captured(&self) -> usize {
        self.captured.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for FakeSnapshots {
    fn capture(&self) -> anyhow::Result<MonitorSnapshot> {
        let n = self.captured.fetch_add(1, Ordering::SeqCst);
        Ok(MonitorSnapshot::new(ResourceUsage {
            cpu_percent: n as f32,
            cpu_count: 4,
            ..ResourceUsage::default()
        }))
    }
}

/// Source whose capture always fails
pub struct FailingSnapshots;

impl SnapshotSource for FailingSnapshots {
    fn capture(&self) -> anyhow::Result<MonitorSnapshot> {
        anyhow::bail!("sensors unavailable")
    }
}

/// Source whose capture panics
pub struct PanickingSnapshots;

impl SnapshotSource for PanickingSnapshots {
    fn capture(&self) -> anyhow::Result<MonitorSnapshot> {
        panic!("sensor driver crashed")
    }
}

/// Source whose capture blocks until released (or 10 s pass)
#[derive(Default)]
pub struct StuckSnapshots {
    entered: AtomicBool,
    released: AtomicBool,
}

impl StuckSnapshots {
    pub fn entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

impl SnapshotSource for StuckSnapshots {
    fn capture(&self) -> anyhow::Result<MonitorSnapshot> {
        self.entered.store(true, Ordering::SeqCst);
        let begin = Instant::now();
        while !self.released.load(Ordering::SeqCst) && begin.elapsed() < Duration::from_secs(10) {
            std::thread::sleep(Duration::from_millis(10));
        }
        anyhow::bail!("released")
    }
}
