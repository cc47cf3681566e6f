//! Spoken replies. Best effort: failures are logged, never returned.

use crate::config::SpeechConfig;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, warn};

pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str);
}

/// Speaks nothing
#[derive(Debug, Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&self, _text: &str) {}
}

/// Runs an external program (e.g. `espeak -s 160`) with the text as its last argument
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    /// None for a blank command line
    pub fn new(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        // not waited on: speech runs alongside the reply
        match Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(mut child) => {
                debug!("Speaking via {} (pid {})", self.program, child.id());
                std::thread::spawn(move || child.wait());
            }
            Err(e) => warn!("Speech command {} failed: {}", self.program, e),
        }
    }
}

pub fn speaker_from_config(config: &SpeechConfig) -> Arc<dyn Speaker> {
    match config.command.as_deref().and_then(CommandSpeaker::new) {
        Some(speaker) => Arc::new(speaker),
        None => Arc::new(SilentSpeaker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_split() {
        let s = CommandSpeaker::new("espeak -s 160").unwrap();
        assert_eq!(s.program, "espeak");
        assert_eq!(s.args, vec!["-s", "160"]);
        assert!(CommandSpeaker::new("   ").is_none());
    }

    #[test]
    fn test_missing_program_is_swallowed() {
        CommandSpeaker::new("definitely-not-a-speech-program").unwrap().speak("hello");
    }
}
