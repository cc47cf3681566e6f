//! Monitor snapshot model.
//!
//! Snapshots are log entries: created once, appended, never edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Foreground window, best effort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub title: String,
    pub class: String,
}

/// Cumulative network counters across all interfaces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Resource usage at capture time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_percent: f32,
    pub cpu_count: usize,
    pub memory_percent: f32,
    pub memory_total_bytes: u64,
    pub memory_available_bytes: u64,
    pub disk_percent: f32,
    pub network: NetworkCounters,
}

/// Static host description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub active_window: Option<ActiveWindow>,
    pub resources: ResourceUsage,
    #[serde(default)]
    pub host: Option<HostInfo>,
}

impl MonitorSnapshot {
    pub fn new(resources: ResourceUsage) -> Self {
        Self {
            timestamp: Utc::now(),
            active_window: None,
            resources,
            host: None,
        }
    }
}
