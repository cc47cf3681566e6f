//! Background activity monitor.
//!
//! A single tokio task captures a snapshot every interval and appends it to
//! the [`SnapshotLog`]. Cancellation goes through a watch channel that the
//! task selects on together with its sleep, so a stop request is seen at
//! once instead of after the current interval.

pub mod log;
pub mod snapshot;

pub use log::SnapshotLog;
pub use snapshot::{active_window, SnapshotSource, SystemSnapshotSource};

use aide_common::{MonitorState, MonitorStatus};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long `stop` waits for the task before aborting it
pub const STOP_GRACE: Duration = Duration::from_secs(2);

struct Worker {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
    interval: Duration,
}

pub struct Monitor {
    source: Arc<dyn SnapshotSource>,
    log: SnapshotLog,
    state: Mutex<MonitorState>,
    worker: tokio::sync::Mutex<Option<Worker>>,
}

impl Monitor {
    pub fn new(source: Arc<dyn SnapshotSource>, log: SnapshotLog) -> Self {
        Self {
            source,
            log,
            state: Mutex::new(MonitorState::Stopped),
            worker: tokio::sync::Mutex::new(None),
        }
    }

    pub fn log(&self) -> &SnapshotLog {
        &self.log
    }

    pub fn state(&self) -> MonitorState {
        self.state.lock().map(|s| *s).unwrap_or(MonitorState::Stopped)
    }

    fn set_state(&self, state: MonitorState) {
        if let Ok(mut s) = self.state.lock() {
            *s = state;
        }
    }

    /// Start capturing every `interval`. Returns false if already running.
    pub async fn start(&self, interval: Duration) -> bool {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            debug!("Monitor already running");
            return false;
        }

        let interval = interval.max(Duration::from_millis(100));
        let (cancel, cancelled) = watch::channel(false);
        let handle = tokio::spawn(run(self.source.clone(), self.log.clone(), interval, cancelled));

        *worker = Some(Worker {
            cancel,
            handle,
            interval,
        });
        self.set_state(MonitorState::Running);
        info!("Monitor started (interval {:?}, log {})", interval, self.log.path().display());
        true
    }

    /// Stop the task. Returns false if it was not running.
    pub async fn stop(&self) -> bool {
        let mut worker = self.worker.lock().await;
        let Some(Worker { cancel, mut handle, .. }) = worker.take() else {
            return false;
        };

        self.set_state(MonitorState::Stopping);
        // receiver gone means the task already ended
        let _ = cancel.send(true);

        if tokio::time::timeout(STOP_GRACE, &mut handle).await.is_err() {
            warn!("Monitor did not stop within {:?}, aborting it", STOP_GRACE);
            handle.abort();
        }

        self.set_state(MonitorState::Stopped);
        info!("Monitor stopped");
        true
    }

    pub async fn status(&self) -> MonitorStatus {
        let interval_secs = self
            .worker
            .lock()
            .await
            .as_ref()
            .map(|w| w.interval.as_secs());
        let log = self.log.clone();
        let entries = tokio::task::spawn_blocking(move || log.len())
            .await
            .unwrap_or(0);

        MonitorStatus {
            state: self.state(),
            interval_secs,
            log_path: self.log.path().display().to_string(),
            entries,
        }
    }
}

async fn run(
    source: Arc<dyn SnapshotSource>,
    log: SnapshotLog,
    interval: Duration,
    mut cancelled: watch::Receiver<bool>,
) {
    loop {
        if *cancelled.borrow() {
            break;
        }

        let source = source.clone();
        let log = log.clone();
        let captured = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let snapshot = source.capture()?;
            log.append(&snapshot)?;
            Ok(())
        })
        .await;

        match captured {
            Ok(Ok(())) => debug!("Monitor snapshot recorded"),
            Ok(Err(e)) => warn!("Monitor capture failed: {}", e),
            Err(e) => error!("Monitor capture task failed: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = cancelled.changed() => {
                if changed.is_err() || *cancelled.borrow() {
                    break;
                }
            }
        }
    }
    debug!("Monitor loop exited");
}
