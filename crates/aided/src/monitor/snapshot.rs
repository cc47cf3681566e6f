//! Snapshot capture.

use aide_common::{ActiveWindow, HostInfo, MonitorSnapshot, NetworkCounters, ResourceUsage};
use anyhow::{anyhow, Result};
use std::process::Command;
use std::sync::Mutex;
use sysinfo::{Disks, Networks, System};
use tracing::debug;

/// Produces one snapshot per call. Called from the blocking pool.
pub trait SnapshotSource: Send + Sync {
    fn capture(&self) -> Result<MonitorSnapshot>;
}

struct Probes {
    system: System,
    disks: Disks,
    networks: Networks,
}

/// sysinfo-backed source with a best-effort active window lookup
pub struct SystemSnapshotSource {
    probes: Mutex<Probes>,
    host: HostInfo,
}

impl SystemSnapshotSource {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();

        let host = HostInfo {
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            os: System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
            kernel: System::kernel_version().unwrap_or_default(),
        };

        Self {
            probes: Mutex::new(Probes {
                system,
                disks: Disks::new_with_refreshed_list(),
                networks: Networks::new_with_refreshed_list(),
            }),
            host,
        }
    }

    fn resources(&self) -> Result<ResourceUsage> {
        let mut guard = self.probes.lock().map_err(|_| anyhow!("system probes poisoned"))?;
        let probes = &mut *guard;
        probes.system.refresh_cpu();
        probes.system.refresh_memory();
        probes.disks.refresh();
        probes.networks.refresh();

        let total = probes.system.total_memory();
        let available = probes.system.available_memory();
        let memory_percent = percent(total.saturating_sub(available), total);

        let network = probes
            .networks
            .list()
            .iter()
            .fold(NetworkCounters::default(), |mut acc, (_, data)| {
                acc.bytes_sent += data.total_transmitted();
                acc.bytes_received += data.total_received();
                acc
            });

        Ok(ResourceUsage {
            cpu_percent: probes.system.global_cpu_info().cpu_usage(),
            cpu_count: probes.system.cpus().len(),
            memory_percent,
            memory_total_bytes: total,
            memory_available_bytes: available,
            disk_percent: root_disk_percent(&probes.disks),
            network,
        })
    }
}

impl Default for SystemSnapshotSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for SystemSnapshotSource {
    fn capture(&self) -> Result<MonitorSnapshot> {
        let mut snapshot = MonitorSnapshot::new(self.resources()?);
        snapshot.active_window = active_window();
        snapshot.host = Some(self.host.clone());
        Ok(snapshot)
    }
}

fn percent(part: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 100.0) as f32
}

/// Usage of the root filesystem, or of all disks when no root mount is listed
fn root_disk_percent(disks: &Disks) -> f32 {
    let root = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"));

    let (total, available) = match root {
        Some(d) => (d.total_space(), d.available_space()),
        None => disks.list().iter().fold((0, 0), |(t, a), d| {
            (t + d.total_space(), a + d.available_space())
        }),
    };
    percent(total.saturating_sub(available), total)
}

fn xdotool(args: &[&str]) -> Option<String> {
    let output = Command::new("xdotool").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Foreground window via xdotool; None without a display or the tool
pub fn active_window() -> Option<ActiveWindow> {
    let title = xdotool(&["getactivewindow", "getwindowname"])?;
    let class = xdotool(&["getactivewindow", "getwindowclassname"]).unwrap_or_default();
    debug!("Active window: {} ({})", title, class);
    Some(ActiveWindow { title, class })
}
