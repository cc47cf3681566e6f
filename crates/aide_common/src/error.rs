//! Error types for Aide.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AideError {
    #[error("Daemon not reachable at {0}")]
    DaemonUnreachable(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Music backend error: {0}")]
    MusicBackend(String),

    #[error("Monitor log error: {0}")]
    MonitorLog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
