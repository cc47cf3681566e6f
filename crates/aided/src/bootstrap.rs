//! Wires configuration and adapters into the shared server state.

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::exec::ProcessExec;
use crate::fileops::FileOps;
use crate::memory::ConversationMemory;
use crate::monitor::{Monitor, SnapshotLog, SnapshotSource, SystemSnapshotSource};
use crate::music::{KeySender, MusicBackend, XdotoolKeys};
use crate::oracle::{HttpOracle, Oracle};
use crate::paths::PathResolver;
use crate::server::AppState;
use crate::session::Session;
use crate::speech::{speaker_from_config, Speaker};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// The external adapters the daemon talks through
pub struct Adapters {
    pub oracle: Arc<dyn Oracle>,
    pub speaker: Arc<dyn Speaker>,
    pub keys: Arc<dyn KeySender>,
    pub snapshots: Arc<dyn SnapshotSource>,
}

impl Adapters {
    /// Production adapters built from config
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            oracle: Arc::new(HttpOracle::new(&config.oracle)?),
            speaker: speaker_from_config(&config.speech),
            keys: Arc::new(XdotoolKeys),
            snapshots: Arc::new(SystemSnapshotSource::new()),
        })
    }
}

pub fn build_dispatcher(config: &Config, keys: Arc<dyn KeySender>, snapshots: Arc<dyn SnapshotSource>) -> Dispatcher {
    let resolver = PathResolver::from_config(&config.paths, config.base_dir());
    Dispatcher::new(
        FileOps::new(resolver),
        ProcessExec::new(Duration::from_secs(config.exec.timeout_secs)),
        MusicBackend::select(&config.music, keys),
        snapshots,
        SnapshotLog::new(&config.monitor.log_path),
    )
}

pub fn build_state(config: &Config, adapters: Adapters) -> AppState {
    let dispatcher = build_dispatcher(config, adapters.keys, adapters.snapshots.clone());
    let session = Session::new(
        Arc::new(dispatcher),
        adapters.oracle,
        adapters.speaker,
        ConversationMemory::new(config.memory.capacity),
        config.memory.context_turns,
    );
    let monitor = Monitor::new(adapters.snapshots, SnapshotLog::new(&config.monitor.log_path));

    AppState::new(
        Arc::new(session),
        Arc::new(monitor),
        Duration::from_secs(config.monitor.interval_secs.max(1)),
    )
}
