//! One conversation: memory, oracle round-trip, dispatch and reply.

use crate::dispatcher::Dispatcher;
use crate::memory::ConversationMemory;
use crate::oracle::Oracle;
use crate::parser;
use crate::speech::Speaker;
use aide_common::{stringify_params, ActionDescriptor, MemoryEntry, ResultEnvelope, Role, TurnReply};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Reply used when the oracle cannot be reached
pub const ORACLE_UNAVAILABLE_REPLY: &str = "I am unable to connect to the neural network at this time.";

/// Directory entries spelled out in a listing reply
const LISTING_PREVIEW: usize = 20;

pub struct Session {
    dispatcher: Arc<Dispatcher>,
    oracle: Arc<dyn Oracle>,
    speaker: Arc<dyn Speaker>,
    memory: Mutex<ConversationMemory>,
    context_turns: usize,
}

impl Session {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        oracle: Arc<dyn Oracle>,
        speaker: Arc<dyn Speaker>,
        memory: ConversationMemory,
        context_turns: usize,
    ) -> Self {
        Self {
            dispatcher,
            oracle,
            speaker,
            memory: Mutex::new(memory),
            context_turns,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one user message end to end. Turns are processed one at a time.
    pub async fn handle_turn(&self, user_text: &str) -> TurnReply {
        let mut memory = self.memory.lock().await;
        let history = memory.recent(self.context_turns);
        memory.append(Role::User, user_text);

        let answer = match self.oracle.ask(user_text, &history).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Oracle unavailable: {}", e);
                memory.append(Role::Assistant, ORACLE_UNAVAILABLE_REPLY);
                return TurnReply::conversation(ORACLE_UNAVAILABLE_REPLY);
            }
        };

        let turn = match parser::parse(&answer) {
            Some(action) => {
                let result = self.dispatcher.dispatch(&action).await;
                TurnReply {
                    reply: compose_reply(&action, &result),
                    action: Some(action.kind.clone()),
                    result: Some(result),
                }
            }
            None => TurnReply::conversation(answer.trim()),
        };

        memory.append(Role::Assistant, turn.reply.as_str());
        drop(memory);

        info!("Turn complete (action: {})", turn.action.as_deref().unwrap_or("none"));
        self.speaker.speak(&turn.reply);
        turn
    }

    /// Run an action without the oracle or memory
    pub async fn direct_dispatch(
        &self,
        kind: &str,
        params: &serde_json::Map<String, Value>,
    ) -> ResultEnvelope {
        let mut action = ActionDescriptor::new(kind);
        action.parameters = stringify_params(params);
        self.dispatcher.dispatch(&action).await
    }

    pub async fn history(&self) -> (usize, Vec<MemoryEntry>) {
        let memory = self.memory.lock().await;
        (memory.capacity(), memory.recent(memory.capacity()))
    }

    pub async fn forget(&self) {
        self.memory.lock().await.clear();
        info!("Conversation memory cleared");
    }
}

/// Reply text for a dispatched action
pub fn compose_reply(action: &ActionDescriptor, result: &ResultEnvelope) -> String {
    if !result.is_success() {
        let detail = result
            .error_detail()
            .or_else(|| result.message())
            .unwrap_or("Unknown error");
        return format!("I encountered an error: {}", detail);
    }

    let mut reply = action
        .reply
        .clone()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "Operation completed.".to_string());
    let data = result.data();

    if let Some(content) = data
        .filter(|_| action.kind == "read_file")
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
    {
        reply.push_str("\n\nFile contents:\n");
        reply.push_str(content);
    } else if let Some(items) = data
        .filter(|_| action.kind == "list_directory")
        .and_then(|d| d.get("items"))
        .and_then(Value::as_array)
    {
        reply.push_str(&format!("\n\nFound {} items:", items.len()));
        for item in items.iter().take(LISTING_PREVIEW) {
            let name = item.get("name").and_then(Value::as_str).unwrap_or("?");
            let kind = item.get("type").and_then(Value::as_str).unwrap_or("?");
            reply.push_str(&format!("\n- {} ({})", name, kind));
        }
        if items.len() > LISTING_PREVIEW {
            reply.push_str(&format!("\n... and {} more items", items.len() - LISTING_PREVIEW));
        }
    } else if let Some(message) = result.message() {
        reply.push('\n');
        reply.push_str(message);
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use aide_common::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_failure_reply() {
        let action = ActionDescriptor::new("read_file");
        let result = ResultEnvelope::failure(ErrorKind::NotFound, "File not found");
        assert_eq!(compose_reply(&action, &result), "I encountered an error: File not found");
    }

    #[test]
    fn test_read_reply_includes_contents() {
        let mut action = ActionDescriptor::new("read_file");
        action.reply = Some("Reading it now.".to_string());
        let result = ResultEnvelope::ok_with("Read 2 bytes", json!({ "content": "hi" }));
        assert_eq!(compose_reply(&action, &result), "Reading it now.\n\nFile contents:\nhi");
    }

    #[test]
    fn test_listing_reply_is_truncated() {
        let action = ActionDescriptor::new("list_directory");
        let items: Vec<_> = (0..25)
            .map(|i| json!({ "name": format!("f{:02}", i), "type": "file" }))
            .collect();
        let result = ResultEnvelope::ok_with("Found 25 items", json!({ "items": items, "count": 25 }));
        let reply = compose_reply(&action, &result);
        assert!(reply.starts_with("Operation completed.\n\nFound 25 items:\n- f00 (file)"));
        assert!(reply.contains("- f19 (file)"));
        assert!(!reply.contains("f20"));
        assert!(reply.ends_with("... and 5 more items"));
    }

    #[test]
    fn test_other_actions_append_message() {
        let mut action = ActionDescriptor::new("music_next");
        action.reply = Some("Skipping.".to_string());
        let result = ResultEnvelope::ok("Skipped to next track");
        assert_eq!(compose_reply(&action, &result), "Skipping.\nSkipped to next track");
    }
}
