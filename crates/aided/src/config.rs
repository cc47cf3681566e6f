//! Configuration management for aided.
//!
//! Loads settings from $AIDE_CONFIG, then /etc/aide/config.toml, or uses
//! defaults. Secrets may also come from the environment, which wins over
//! the file.

use aide_common::{AideError, DEFAULT_BIND_ADDR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/aide/config.toml";

/// Environment variable naming an alternate config file
pub const CONFIG_ENV: &str = "AIDE_CONFIG";

/// Filesystem policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory relative paths are resolved against (home when unset)
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Prefixes no file operation may touch
    #[serde(default = "default_restricted_roots")]
    pub restricted_roots: Vec<String>,
}

#[cfg(not(windows))]
fn default_restricted_roots() -> Vec<String> {
    ["/bin", "/boot", "/dev", "/etc", "/lib", "/lib64", "/proc", "/sbin", "/sys", "/usr"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(windows)]
fn default_restricted_roots() -> Vec<String> {
    ["C:\\Windows", "C:\\Program Files", "C:\\Program Files (x86)"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            restricted_roots: default_restricted_roots(),
        }
    }
}

/// Shell execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    #[serde(default = "default_exec_timeout")]
    pub timeout_secs: u64,
}

fn default_exec_timeout() -> u64 {
    30
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_exec_timeout(),
        }
    }
}

/// Music control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicConfig {
    /// Spotify Web API bearer token; SPOTIFY_ACCESS_TOKEN overrides it
    #[serde(default)]
    pub spotify_token: Option<String>,

    #[serde(default = "default_spotify_api")]
    pub spotify_api: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Minimum gap between media-key presses
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Volume change per media-key press, in percent
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,

    /// Assumed system volume when the minimal backend starts
    #[serde(default = "default_initial_volume")]
    pub initial_volume: u8,
}

fn default_spotify_api() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_cooldown_ms() -> u64 {
    500
}

fn default_volume_step() -> u8 {
    5
}

fn default_initial_volume() -> u8 {
    50
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            spotify_token: None,
            spotify_api: default_spotify_api(),
            request_timeout_secs: default_request_timeout(),
            cooldown_ms: default_cooldown_ms(),
            volume_step: default_volume_step(),
            initial_volume: default_initial_volume(),
        }
    }
}

/// Conversation memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,

    /// How many recent entries are sent to the oracle as context
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
}

fn default_memory_capacity() -> usize {
    50
}

fn default_context_turns() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
            context_turns: default_context_turns(),
        }
    }
}

/// Background monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_monitor_log")]
    pub log_path: PathBuf,

    /// Start the monitor together with the daemon
    #[serde(default)]
    pub autostart: bool,
}

fn default_monitor_interval() -> u64 {
    5
}

fn default_monitor_log() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("aide")
        .join("monitoring_data.json")
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval(),
            log_path: default_monitor_log(),
            autostart: false,
        }
    }
}

/// Language-model endpoint (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_oracle_model")]
    pub model: String,

    /// AIDE_ORACLE_API_KEY overrides it
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

fn default_oracle_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_oracle_model() -> String {
    "openrouter/auto".to_string()
}

fn default_oracle_timeout() -> u64 {
    30
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_oracle_endpoint(),
            model: default_oracle_model(),
            api_key: None,
            timeout_secs: default_oracle_timeout(),
        }
    }
}

/// Text-to-speech
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Program that receives the reply as its last argument (e.g. "espeak")
    #[serde(default)]
    pub command: Option<String>,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub music: MusicConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load config from $AIDE_CONFIG or the system path, falling back to defaults
    pub fn load() -> Self {
        let explicit = std::env::var(CONFIG_ENV).ok();
        let candidates = explicit.iter().map(String::as_str).chain(std::iter::once(CONFIG_PATH));

        let mut config = candidates
            .filter_map(|path| match Self::load_from_path(Path::new(path)) {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!("Config {} not usable: {}", path, e);
                    None
                }
            })
            .next()
            .unwrap_or_else(|| {
                warn!("Config not found, using defaults");
                Config::default()
            });

        config.apply_env();
        config
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, AideError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, AideError> {
        toml::from_str(content).map_err(|e| AideError::Config(e.to_string()))
    }

    /// Environment overrides for secrets
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("SPOTIFY_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                self.music.spotify_token = Some(token);
            }
        }
        if let Ok(key) = std::env::var("AIDE_ORACLE_API_KEY") {
            if !key.trim().is_empty() {
                self.oracle.api_key = Some(key);
            }
        }
    }

    /// Directory relative paths resolve against
    pub fn base_dir(&self) -> PathBuf {
        self.paths
            .base_dir
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.memory.capacity, 50);
        assert_eq!(config.exec.timeout_secs, 30);
        assert_eq!(config.music.cooldown_ms, 500);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert!(!config.paths.restricted_roots.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [memory]
            capacity = 5

            [paths]
            restricted_roots = ["/srv/secret"]
            "#,
        )
        .unwrap();
        assert_eq!(config.memory.capacity, 5);
        assert_eq!(config.memory.context_turns, 10);
        assert_eq!(config.paths.restricted_roots, vec!["/srv/secret".to_string()]);
        assert_eq!(config.monitor.interval_secs, 5);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("[memory\ncapacity = ").unwrap_err();
        assert!(matches!(err, AideError::Config(_)));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[exec]\ntimeout_secs = 3\n").unwrap();
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.exec.timeout_secs, 3);
    }
}
