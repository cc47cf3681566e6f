//! ProcessExec - shell command execution with a timeout.
//!
//! Runs the command through the platform shell and captures exit code,
//! stdout, stderr and duration. There is no allow-list and no inspection of
//! the command text: whatever reaches this layer runs with the daemon's
//! privileges. That is the trust boundary of the whole system.
//!
//! On timeout the child is killed and reaped before returning.

use aide_common::{ErrorKind, ResultEnvelope};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{info, warn};

/// Maximum output length to capture per stream (prevent memory issues)
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Captured outcome of a finished command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub command: String,
    /// None when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stdout_truncated: bool,
    pub stderr: String,
    pub stderr_truncated: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ProcessExec {
    default_timeout: Duration,
}

impl ProcessExec {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `command` through the shell. `timeout` falls back to the default.
    pub async fn execute(&self, command: &str, timeout: Option<Duration>) -> ResultEnvelope {
        let command = command.trim();
        if command.is_empty() {
            return ResultEnvelope::failure(ErrorKind::InvalidInput, "No command provided");
        }
        let timeout = timeout.unwrap_or(self.default_timeout);

        info!("Executing shell command (timeout {}s): {}", timeout.as_secs(), command);
        let start = Instant::now();

        let mut child = match shell(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn shell: {}", e);
                return ResultEnvelope::failure(ErrorKind::IoError, format!("Failed to start command: {}", e));
            }
        };

        let stdout_task = child.stdout.take().map(|s| tokio::spawn(read_capped(s)));
        let stderr_task = child.stderr.take().map(|s| tokio::spawn(read_capped(s)));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                abort_readers(stdout_task, stderr_task);
                return ResultEnvelope::failure(ErrorKind::IoError, format!("Failed to wait for command: {}", e));
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out command: {}", e);
                }
                abort_readers(stdout_task, stderr_task);
                warn!("Command timed out after {}s: {}", timeout.as_secs(), command);
                return ResultEnvelope::failure(
                    ErrorKind::Timeout,
                    format!("Command execution timed out after {}s", timeout.as_secs()),
                );
            }
        };

        let (stdout, stdout_truncated) = collect(stdout_task).await;
        let (stderr, stderr_truncated) = collect(stderr_task).await;

        let result = CommandResult {
            command: command.to_string(),
            exit_code: status.code(),
            stdout,
            stdout_truncated,
            stderr,
            stderr_truncated,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        let data = serde_json::to_value(&result).unwrap_or_default();

        if status.success() {
            ResultEnvelope::ok_with("Command completed", data)
        } else {
            let detail = match result.exit_code {
                Some(code) => format!("Command exited with code {}", code),
                None => "Command was terminated by a signal".to_string(),
            };
            ResultEnvelope::failure(ErrorKind::NonZeroExit, detail).with_data(data)
        }
    }
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

type Reader = tokio::task::JoinHandle<std::io::Result<(Vec<u8>, bool)>>;

/// Keep the first MAX_OUTPUT_BYTES and drain the rest so the child never blocks on a full pipe
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<(Vec<u8>, bool)> {
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let room = MAX_OUTPUT_BYTES.saturating_sub(kept.len());
        if n > room {
            truncated = true;
        }
        kept.extend_from_slice(&buf[..n.min(room)]);
    }
    Ok((kept, truncated))
}

async fn collect(task: Option<Reader>) -> (String, bool) {
    match task {
        Some(handle) => match handle.await {
            Ok(Ok((bytes, truncated))) => (String::from_utf8_lossy(&bytes).into_owned(), truncated),
            Ok(Err(e)) => {
                warn!("Failed to read command output: {}", e);
                (String::new(), false)
            }
            Err(e) => {
                warn!("Output reader task failed: {}", e);
                (String::new(), false)
            }
        },
        None => (String::new(), false),
    }
}

fn abort_readers(stdout: Option<Reader>, stderr: Option<Reader>) {
    for handle in [stdout, stderr].into_iter().flatten() {
        handle.abort();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn exec() -> ProcessExec {
        ProcessExec::new(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let env = exec().execute("echo hello", None).await;
        assert!(env.is_success());
        let data = env.data().unwrap();
        assert_eq!(data["stdout"], "hello\n");
        assert_eq!(data["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_output() {
        let env = exec().execute("echo oops >&2; exit 3", None).await;
        assert!(!env.is_success());
        assert_eq!(env.error_kind(), Some(ErrorKind::NonZeroExit));
        let data = env.data().unwrap();
        assert_eq!(data["exit_code"], 3);
        assert_eq!(data["stderr"], "oops\n");
    }

    #[tokio::test]
    async fn test_empty_command_is_invalid() {
        let env = exec().execute("   ", None).await;
        assert_eq!(env.error_kind(), Some(ErrorKind::InvalidInput));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let cmd = format!("sleep 3; touch {}", marker.display());

        let start = Instant::now();
        let env = exec().execute(&cmd, Some(Duration::from_millis(300))).await;
        assert_eq!(env.error_kind(), Some(ErrorKind::Timeout));
        assert!(start.elapsed() < Duration::from_secs(2));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!marker.exists(), "timed out command kept running");
    }

    #[tokio::test]
    async fn test_output_is_capped() {
        let cmd = format!("head -c {} /dev/zero | tr '\\0' 'x'", MAX_OUTPUT_BYTES + 100);
        let env = exec().execute(&cmd, None).await;
        assert!(env.is_success());
        let data = env.data().unwrap();
        assert_eq!(data["stdout_truncated"], true);
        assert_eq!(data["stdout"].as_str().unwrap().len(), MAX_OUTPUT_BYTES);
    }
}
