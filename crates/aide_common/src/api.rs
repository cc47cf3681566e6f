//! HTTP request and response bodies shared by aided and aidectl.

use crate::envelope::ResultEnvelope;
use crate::memory::MemoryEntry;
use serde::{Deserialize, Serialize};

/// POST /chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Outcome of one conversational turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultEnvelope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl TurnReply {
    pub fn conversation(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            result: None,
            action: None,
        }
    }
}

/// POST /system/execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// POST /monitor/start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorStartRequest {
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

/// Monitor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Stopped,
    Running,
    Stopping,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// GET /monitor/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub state: MonitorState,
    pub interval_secs: Option<u64>,
    pub log_path: String,
    pub entries: usize,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub music_backend: String,
    pub monitor: MonitorState,
    pub action_set_version: u32,
    /// Seconds since the daemon started
    #[serde(default)]
    pub uptime_secs: u64,
}

/// GET /memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub capacity: usize,
    pub entries: Vec<MemoryEntry>,
}
