//! Result envelope returned by every dispatchable operation.
//!
//! An envelope is either a success (optional message and data) or a failure
//! carrying an [`ErrorKind`]. The fields are private so the only way to build
//! one is through the constructors, which keep that invariant. Deserialized
//! envelopes are checked the same way.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure taxonomy for dispatch results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Path falls under a restricted root
    AccessDenied,
    NotFound,
    NotAFile,
    NotADirectory,
    /// File content is not valid UTF-8
    BinaryUnsupported,
    /// Unanticipated filesystem failure
    IoError,
    /// Process execution exceeded its timeout
    Timeout,
    /// Capability not available on the active backend
    Unsupported,
    /// Action kind outside the closed action set
    UnknownAction,
    /// Caught unexpected failure in a lower layer
    Internal,
    /// Parameter rejected by the operation (empty command, bad volume)
    InvalidInput,
    /// Command ran but exited non-zero
    NonZeroExit,
    /// Remote music API reported an error
    Backend,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::NotFound => "not_found",
            Self::NotAFile => "not_a_file",
            Self::NotADirectory => "not_a_directory",
            Self::BinaryUnsupported => "binary_unsupported",
            Self::IoError => "io_error",
            Self::Timeout => "timeout",
            Self::Unsupported => "unsupported",
            Self::UnknownAction => "unknown_action",
            Self::Internal => "internal",
            Self::InvalidInput => "invalid_input",
            Self::NonZeroExit => "non_zero_exit",
            Self::Backend => "backend",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Uniform success/error wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct ResultEnvelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
}

impl ResultEnvelope {
    /// Success with a message and no payload
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error_kind: None,
            error_detail: None,
        }
    }

    /// Success with a message and a structured payload
    pub fn ok_with(message: impl Into<String>, data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok(message)
        }
    }

    /// Failure of the given kind
    pub fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            success: false,
            message: Some(detail.clone()),
            data: None,
            error_kind: Some(kind),
            error_detail: Some(detail),
        }
    }

    /// Attach a payload (also allowed on failures, e.g. stderr of a command)
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    /// One-line summary suitable for logs and replies
    pub fn summary(&self) -> String {
        match (self.success, self.error_kind) {
            (true, _) => self.message.clone().unwrap_or_else(|| "ok".to_string()),
            (false, Some(kind)) => format!(
                "{}: {}",
                kind,
                self.error_detail.as_deref().unwrap_or("no detail")
            ),
            (false, None) => "failed".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error_kind: Option<ErrorKind>,
    #[serde(default)]
    error_detail: Option<String>,
}

impl TryFrom<RawEnvelope> for ResultEnvelope {
    type Error = String;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        match (raw.success, raw.error_kind) {
            (true, Some(kind)) => Err(format!("successful envelope carries error kind {}", kind)),
            (false, None) => Err("failed envelope is missing error_kind".to_string()),
            _ => Ok(Self {
                success: raw.success,
                message: raw.message,
                data: raw.data,
                error_kind: raw.error_kind,
                error_detail: raw.error_detail,
            }),
        }
    }
}
