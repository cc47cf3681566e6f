//! Language-model oracle.
//!
//! The oracle turns a user message into either plain conversation or a reply
//! containing a JSON action block. The shipped adapter talks to any
//! OpenAI-compatible chat completions endpoint.

use crate::config::OracleConfig;
use aide_common::{ActionKind, AideError, MemoryEntry, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Answer `prompt` given the earlier turns in `history`
    async fn ask(&self, prompt: &str, history: &[MemoryEntry]) -> Result<String, AideError>;
}

/// Instructions sent ahead of every conversation
pub fn system_prompt() -> String {
    let mut actions = String::new();
    for kind in ActionKind::ALL {
        let params = kind.parameters();
        if params.is_empty() {
            actions.push_str(&format!("- {}\n", kind));
        } else {
            actions.push_str(&format!("- {} ({})\n", kind, params.join(", ")));
        }
    }

    format!(
        r#"You are Aide, a desktop assistant that can manage files, run shell commands, control music and report on the system.

When the user asks for an operation, answer with one JSON object in exactly this format:

{{"action": "<action name>", "params": {{"<name>": "<value>"}}, "response": "<short confirmation for the user>"}}

Available actions and their parameters:
{actions}
Paths may start with Desktop, Documents, Downloads, Music, Pictures, Videos or ~ and are resolved to the user's folders.
write_file takes mode "append" to append instead of overwriting. music_volume takes a number from 0 to 100.

Examples:
- "Read the file test.txt" -> {{"action": "read_file", "params": {{"file_path": "test.txt"}}, "response": "Reading test.txt for you now."}}
- "Create notes.md on my desktop" -> {{"action": "write_file", "params": {{"file_path": "Desktop/notes.md", "content": ""}}, "response": "Creating notes.md on your Desktop."}}
- "Play music" -> {{"action": "music_play", "params": {{}}, "response": "Resuming playback."}}

Reply in the same language as the user and keep the JSON keys in English.
If the user is just chatting, answer normally without JSON."#
    )
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// OpenAI-compatible HTTP oracle
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    system_prompt: String,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, AideError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AideError::Oracle(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            system_prompt: system_prompt(),
        })
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn ask(&self, prompt: &str, history: &[MemoryEntry]) -> Result<String, AideError> {
        let mut messages = vec![ChatMessage {
            role: "system",
            content: &self.system_prompt,
        }];
        messages.extend(history.iter().map(|entry| ChatMessage {
            role: match entry.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &entry.text,
        }));
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!("Oracle request to {} ({} history turns)", self.endpoint, history.len());
        let response = request
            .send()
            .await
            .map_err(|e| AideError::Oracle(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Oracle returned {}", status);
            return Err(AideError::Oracle(format!("endpoint returned {}", status)));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AideError::Oracle(format!("invalid response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AideError::Oracle("response contained no message".to_string()))
    }
}
