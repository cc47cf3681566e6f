//! Dispatcher - validates an action descriptor and routes it to its provider.
//!
//! The dispatcher holds only immutable collaborators. Filesystem work runs on
//! the blocking pool; a panic there comes back as a join error and is
//! reported as `Internal` instead of unwinding into the caller.

use crate::exec::ProcessExec;
use crate::fileops::{FileOps, WriteMode};
use crate::monitor::{SnapshotLog, SnapshotSource};
use crate::music::{parse_volume, BackendChoice, MusicBackend};
use aide_common::{ActionDescriptor, ActionKind, ErrorKind, ResultEnvelope};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

pub struct Dispatcher {
    files: Arc<FileOps>,
    exec: ProcessExec,
    music: MusicBackend,
    snapshots: Arc<dyn SnapshotSource>,
    monitor_log: SnapshotLog,
}

impl Dispatcher {
    pub fn new(
        files: FileOps,
        exec: ProcessExec,
        music: MusicBackend,
        snapshots: Arc<dyn SnapshotSource>,
        monitor_log: SnapshotLog,
    ) -> Self {
        Self {
            files: Arc::new(files),
            exec,
            music,
            snapshots,
            monitor_log,
        }
    }

    pub fn files(&self) -> &FileOps {
        &self.files
    }

    pub fn music_backend(&self) -> BackendChoice {
        self.music.choice()
    }

    pub async fn dispatch(&self, action: &ActionDescriptor) -> ResultEnvelope {
        let request_id = Uuid::new_v4().to_string();
        let kind = match action.action_kind() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("[{}] Rejected action '{}'", request_id, action.kind);
                return ResultEnvelope::failure(ErrorKind::UnknownAction, e.to_string());
            }
        };

        info!("[{}] Dispatching {} ({:?})", request_id, kind, kind.provider());
        let start = Instant::now();
        let result = self.route(kind, action).await;
        let elapsed = start.elapsed().as_millis();

        if result.is_success() {
            info!("[{}] {} succeeded in {}ms", request_id, kind, elapsed);
        } else {
            warn!("[{}] {} failed in {}ms: {}", request_id, kind, elapsed, result.summary());
        }
        result
    }

    async fn route(&self, kind: ActionKind, action: &ActionDescriptor) -> ResultEnvelope {
        let p = |key: &str| action.param(key).to_string();
        let music = self.music.control();

        match kind {
            ActionKind::ReadFile => {
                let path = p("file_path");
                self.blocking(move |f| f.read(&path)).await
            }
            ActionKind::WriteFile => {
                let (path, content) = (p("file_path"), p("content"));
                let mode = WriteMode::parse(action.param("mode"));
                self.blocking(move |f| f.write(&path, &content, mode)).await
            }
            ActionKind::DeleteFile => {
                let path = p("file_path");
                self.blocking(move |f| f.delete(&path)).await
            }
            ActionKind::RenameFile => {
                let (path, new_path) = (p("file_path"), p("new_path"));
                self.blocking(move |f| f.rename(&path, &new_path)).await
            }
            ActionKind::MoveFile => {
                let (path, destination) = (p("file_path"), p("destination"));
                self.blocking(move |f| f.move_to(&path, &destination)).await
            }
            ActionKind::CopyFile => {
                let (path, destination) = (p("file_path"), p("destination"));
                self.blocking(move |f| f.copy(&path, &destination)).await
            }
            ActionKind::ListDirectory => {
                let path = p("dir_path");
                self.blocking(move |f| f.list_directory(&path)).await
            }
            ActionKind::CreateDirectory => {
                let path = p("dir_path");
                self.blocking(move |f| f.create_directory(&path)).await
            }
            ActionKind::DeleteDirectory => {
                let path = p("dir_path");
                self.blocking(move |f| f.delete_directory(&path)).await
            }
            ActionKind::FileInfo => {
                let path = p("file_path");
                self.blocking(move |f| f.info(&path)).await
            }
            ActionKind::ExecuteCommand => match parse_timeout(action.param("timeout_secs")) {
                Ok(timeout) => self.exec.execute(action.param("command"), timeout).await,
                Err(envelope) => envelope,
            },
            ActionKind::MusicPlay => music.play().await,
            ActionKind::MusicPause => music.pause().await,
            ActionKind::MusicNext => music.next().await,
            ActionKind::MusicPrevious => music.previous().await,
            ActionKind::MusicSearch => music.search(action.param("query")).await,
            ActionKind::MusicPlaySong => music.play_by_query(action.param("query")).await,
            ActionKind::MusicCurrent => music.current_playback().await,
            ActionKind::MusicVolume => match parse_volume(action.param("volume")) {
                Some(volume) => music.set_volume(volume).await,
                None => ResultEnvelope::failure(
                    ErrorKind::InvalidInput,
                    format!("Invalid volume '{}': expected a number from 0 to 100", action.param("volume")),
                ),
            },
            ActionKind::SystemInfo => self.system_info().await,
            ActionKind::MonitorLatest => self.monitor_latest().await,
        }
    }

    async fn blocking<F>(&self, op: F) -> ResultEnvelope
    where
        F: FnOnce(&FileOps) -> ResultEnvelope + Send + 'static,
    {
        let files = self.files.clone();
        tokio::task::spawn_blocking(move || op(&files))
            .await
            .unwrap_or_else(|e| ResultEnvelope::failure(ErrorKind::Internal, format!("File operation failed: {}", e)))
    }

    async fn system_info(&self) -> ResultEnvelope {
        let source = self.snapshots.clone();
        match tokio::task::spawn_blocking(move || source.capture()).await {
            Ok(Ok(snapshot)) => match serde_json::to_value(&snapshot) {
                Ok(data) => ResultEnvelope::ok_with("System information collected", data),
                Err(e) => ResultEnvelope::failure(ErrorKind::Internal, e.to_string()),
            },
            Ok(Err(e)) => ResultEnvelope::failure(ErrorKind::Internal, format!("Failed to collect system info: {}", e)),
            Err(e) => ResultEnvelope::failure(ErrorKind::Internal, format!("System info task failed: {}", e)),
        }
    }

    async fn monitor_latest(&self) -> ResultEnvelope {
        let log = self.monitor_log.clone();
        match tokio::task::spawn_blocking(move || log.latest()).await {
            Ok(Ok(Some(snapshot))) => match serde_json::to_value(&snapshot) {
                Ok(data) => ResultEnvelope::ok_with("Latest monitoring entry", data),
                Err(e) => ResultEnvelope::failure(ErrorKind::Internal, e.to_string()),
            },
            Ok(Ok(None)) => ResultEnvelope::failure(ErrorKind::NotFound, "No monitoring data recorded yet"),
            Ok(Err(e)) => ResultEnvelope::failure(ErrorKind::IoError, e.to_string()),
            Err(e) => ResultEnvelope::failure(ErrorKind::Internal, format!("Monitor log task failed: {}", e)),
        }
    }
}

/// Empty or zero means the default timeout
fn parse_timeout(raw: &str) -> Result<Option<Duration>, ResultEnvelope> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let invalid = || {
        ResultEnvelope::failure(
            ErrorKind::InvalidInput,
            format!("Invalid timeout '{}': expected a positive number of seconds", raw),
        )
    };
    match raw.parse::<f64>() {
        Ok(secs) if secs == 0.0 => Ok(None),
        Ok(secs) => Duration::try_from_secs_f64(secs).map(Some).map_err(|_| invalid()),
        Err(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("").unwrap(), None);
        assert_eq!(parse_timeout("0").unwrap(), None);
        assert_eq!(parse_timeout("5").unwrap(), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout("0.5").unwrap(), Some(Duration::from_millis(500)));
        assert!(parse_timeout("-1").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    struct NoSnapshots;

    impl SnapshotSource for NoSnapshots {
        fn capture(&self) -> anyhow::Result<aide_common::MonitorSnapshot> {
            anyhow::bail!("no snapshots")
        }
    }

    #[tokio::test]
    async fn test_panicking_file_operation_is_internal() {
        let dir = tempfile::tempdir().unwrap();
        let keys = Arc::new(crate::music::RecordingKeys::default());
        let dispatcher = Dispatcher::new(
            FileOps::new(crate::paths::PathResolver::new(dir.path(), &[])),
            ProcessExec::new(Duration::from_secs(5)),
            MusicBackend::minimal(crate::music::MinimalBackend::new(keys, Duration::ZERO, 50, 5)),
            Arc::new(NoSnapshots),
            SnapshotLog::new(dir.path().join("log.json")),
        );

        let env = dispatcher.blocking(|_| panic!("disk on fire")).await;
        assert_eq!(env.error_kind(), Some(ErrorKind::Internal));
        assert!(env.error_detail().unwrap().starts_with("File operation failed"));
    }
}
