//! Append-only snapshot log stored as one JSON array.
//!
//! Every append rewrites the whole file through a sibling temp file and an
//! atomic rename, so a reader never observes a partial array.

use aide_common::{AideError, MonitorSnapshot};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct SnapshotLog {
    path: PathBuf,
}

impl SnapshotLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, oldest first. A missing file is an empty log.
    pub fn entries(&self) -> Result<Vec<MonitorSnapshot>, AideError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| AideError::MonitorLog(format!("{}: {}", self.path.display(), e)))
    }

    pub fn latest(&self) -> Result<Option<MonitorSnapshot>, AideError> {
        Ok(self.entries()?.pop())
    }

    pub fn len(&self) -> usize {
        self.entries().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append(&self, snapshot: &MonitorSnapshot) -> Result<(), AideError> {
        let mut entries = match self.entries() {
            Ok(entries) => entries,
            Err(AideError::MonitorLog(reason)) => {
                self.quarantine(&reason)?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        entries.push(snapshot.clone());
        self.write_all(&entries)
    }

    fn write_all(&self, entries: &[MonitorSnapshot]) -> Result<(), AideError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.sibling("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Move an unreadable log to `<name>.corrupt` so a fresh one can start
    fn quarantine(&self, reason: &str) -> Result<(), AideError> {
        let target = self.sibling("corrupt");
        warn!("Monitor log is corrupt ({}), moving it to {}", reason, target.display());
        fs::rename(&self.path, &target)?;
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "monitoring_data.json".into());
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aide_common::ResourceUsage;
    use tempfile::TempDir;

    fn snapshot(cpu: f32) -> MonitorSnapshot {
        MonitorSnapshot::new(ResourceUsage {
            cpu_percent: cpu,
            ..ResourceUsage::default()
        })
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = SnapshotLog::new(dir.path().join("log.json"));
        assert!(log.entries().unwrap().is_empty());
        assert!(log.latest().unwrap().is_none());
    }

    #[test]
    fn test_append_and_latest() {
        let dir = TempDir::new().unwrap();
        let log = SnapshotLog::new(dir.path().join("nested/log.json"));
        log.append(&snapshot(1.0)).unwrap();
        log.append(&snapshot(2.0)).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().unwrap().unwrap().resources.cpu_percent, 2.0);
        assert!(!dir.path().join("nested/log.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_log_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.json");
        fs::write(&path, "[{ broken").unwrap();

        let log = SnapshotLog::new(&path);
        assert!(log.entries().is_err());
        log.append(&snapshot(3.0)).unwrap();

        assert_eq!(log.len(), 1);
        let corrupt = dir.path().join("log.json.corrupt");
        assert_eq!(fs::read_to_string(corrupt).unwrap(), "[{ broken");
    }
}
