//! Action descriptors and the closed action set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Bumped whenever a kind is added to or removed from [`ActionKind`]
pub const ACTION_SET_VERSION: u32 = 1;

/// Every action the dispatcher knows how to route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ReadFile,
    WriteFile,
    DeleteFile,
    RenameFile,
    MoveFile,
    CopyFile,
    ListDirectory,
    CreateDirectory,
    DeleteDirectory,
    FileInfo,
    ExecuteCommand,
    MusicPlay,
    MusicPause,
    MusicNext,
    MusicPrevious,
    MusicSearch,
    MusicPlaySong,
    MusicCurrent,
    MusicVolume,
    SystemInfo,
    MonitorLatest,
}

/// Which capability provider handles a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Files,
    Process,
    Music,
    Monitor,
}

impl ActionKind {
    pub const ALL: [ActionKind; 21] = [
        Self::ReadFile,
        Self::WriteFile,
        Self::DeleteFile,
        Self::RenameFile,
        Self::MoveFile,
        Self::CopyFile,
        Self::ListDirectory,
        Self::CreateDirectory,
        Self::DeleteDirectory,
        Self::FileInfo,
        Self::ExecuteCommand,
        Self::MusicPlay,
        Self::MusicPause,
        Self::MusicNext,
        Self::MusicPrevious,
        Self::MusicSearch,
        Self::MusicPlaySong,
        Self::MusicCurrent,
        Self::MusicVolume,
        Self::SystemInfo,
        Self::MonitorLatest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::DeleteFile => "delete_file",
            Self::RenameFile => "rename_file",
            Self::MoveFile => "move_file",
            Self::CopyFile => "copy_file",
            Self::ListDirectory => "list_directory",
            Self::CreateDirectory => "create_directory",
            Self::DeleteDirectory => "delete_directory",
            Self::FileInfo => "file_info",
            Self::ExecuteCommand => "execute_command",
            Self::MusicPlay => "music_play",
            Self::MusicPause => "music_pause",
            Self::MusicNext => "music_next",
            Self::MusicPrevious => "music_previous",
            Self::MusicSearch => "music_search",
            Self::MusicPlaySong => "music_play_song",
            Self::MusicCurrent => "music_current",
            Self::MusicVolume => "music_volume",
            Self::SystemInfo => "system_info",
            Self::MonitorLatest => "monitor_latest",
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::ExecuteCommand => Provider::Process,
            Self::MusicPlay
            | Self::MusicPause
            | Self::MusicNext
            | Self::MusicPrevious
            | Self::MusicSearch
            | Self::MusicPlaySong
            | Self::MusicCurrent
            | Self::MusicVolume => Provider::Music,
            Self::SystemInfo | Self::MonitorLatest => Provider::Monitor,
            _ => Provider::Files,
        }
    }

    /// Parameter names the kind reads
    pub fn parameters(&self) -> &'static [&'static str] {
        match self {
            Self::ReadFile | Self::DeleteFile | Self::FileInfo => &["file_path"],
            Self::WriteFile => &["file_path", "content", "mode"],
            Self::RenameFile => &["file_path", "new_path"],
            Self::MoveFile | Self::CopyFile => &["file_path", "destination"],
            Self::ListDirectory | Self::CreateDirectory | Self::DeleteDirectory => &["dir_path"],
            Self::ExecuteCommand => &["command", "timeout_secs"],
            Self::MusicSearch | Self::MusicPlaySong => &["query"],
            Self::MusicVolume => &["volume"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a name is outside the closed action set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownActionKind(pub String);

impl std::fmt::Display for UnknownActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown action: {}", self.0)
    }
}

impl std::error::Error for UnknownActionKind {}

impl FromStr for ActionKind {
    type Err = UnknownActionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| UnknownActionKind(name.to_string()))
    }
}

/// Structured action extracted from oracle text or supplied directly.
///
/// `kind` is kept as the raw name so an unrecognized action reaches the
/// dispatcher and is rejected there instead of vanishing during parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub kind: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub origin_text: String,
    /// Confirmation text the oracle attached to the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl ActionDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameters: BTreeMap::new(),
            origin_text: String::new(),
            reply: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Parameter value, empty when absent
    pub fn param(&self, key: &str) -> &str {
        self.parameters.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn action_kind(&self) -> Result<ActionKind, UnknownActionKind> {
        self.kind.parse()
    }
}

/// Flatten JSON parameter values into strings.
///
/// Strings pass through, numbers and booleans are rendered, null becomes an
/// empty string and nested values keep their JSON text.
pub fn stringify_params(params: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}
