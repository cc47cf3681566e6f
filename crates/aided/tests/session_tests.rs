//! Session Tests
//!
//! Full conversational turns with a scripted oracle: plain chat, actions
//! embedded in prose, oracle outages and memory bookkeeping.

mod common;

use aide_common::{ErrorKind, Role};
use aided::session::ORACLE_UNAVAILABLE_REPLY;
use common::{FakeOracle, Sandbox};
use serde_json::json;
use std::fs;

#[tokio::test]
async fn test_plain_conversation() {
    let sandbox = Sandbox::new();
    let oracle = FakeOracle::scripted(&["Hello! How can I help?"]);
    let state = sandbox.state(oracle.clone());

    let turn = state.session.handle_turn("hi there").await;
    assert_eq!(turn.reply, "Hello! How can I help?");
    assert!(turn.action.is_none());
    assert!(turn.result.is_none());

    let (_, history) = state.session.history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].text, "Hello! How can I help?");
}

#[tokio::test]
async fn test_action_in_prose_is_dispatched() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.home().join("notes.txt"), "buy milk").unwrap();
    let oracle = FakeOracle::scripted(&[
        "Sure thing!\n```json\n{\"action\": \"read_file\", \"params\": {\"file_path\": \"notes.txt\"}, \"response\": \"Reading notes.txt.\"}\n```",
    ]);
    let state = sandbox.state(oracle);

    let turn = state.session.handle_turn("read my notes").await;
    assert_eq!(turn.action.as_deref(), Some("read_file"));
    assert!(turn.result.as_ref().unwrap().is_success());
    assert_eq!(turn.reply, "Reading notes.txt.\n\nFile contents:\nbuy milk");
}

#[tokio::test]
async fn test_failed_action_reply() {
    let sandbox = Sandbox::new();
    let oracle = FakeOracle::scripted(&[r#"{"action": "music_search", "params": {"query": "jazz"}, "response": "Searching."}"#]);
    let state = sandbox.state(oracle);

    let turn = state.session.handle_turn("find some jazz").await;
    let result = turn.result.unwrap();
    assert_eq!(result.error_kind(), Some(ErrorKind::Unsupported));
    assert!(turn.reply.starts_with("I encountered an error: Search requires the Spotify API"));
}

#[tokio::test]
async fn test_unknown_action_from_oracle() {
    let sandbox = Sandbox::new();
    let oracle = FakeOracle::scripted(&[r#"{"action": "launch_rocket", "params": {}}"#]);
    let state = sandbox.state(oracle);

    let turn = state.session.handle_turn("launch").await;
    assert_eq!(turn.action.as_deref(), Some("launch_rocket"));
    assert_eq!(turn.result.unwrap().error_kind(), Some(ErrorKind::UnknownAction));
    assert_eq!(turn.reply, "I encountered an error: Unknown action: launch_rocket");
}

#[tokio::test]
async fn test_oracle_outage_gives_fixed_reply() {
    let sandbox = Sandbox::new();
    let oracle = FakeOracle::scripted(&[]);
    let state = sandbox.state(oracle);

    let turn = state.session.handle_turn("anyone there?").await;
    assert_eq!(turn.reply, ORACLE_UNAVAILABLE_REPLY);
    assert!(turn.result.is_none());
}

#[tokio::test]
async fn test_history_is_passed_to_oracle() {
    let sandbox = Sandbox::new();
    let oracle = FakeOracle::scripted(&["one", "two", "three"]);
    let state = sandbox.state(oracle.clone());

    state.session.handle_turn("first").await;
    state.session.handle_turn("second").await;
    state.session.handle_turn("third").await;

    let calls = oracle.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].1.is_empty());
    assert_eq!(calls[2].0, "third");
    let texts: Vec<_> = calls[2].1.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "one", "second", "two"]);
}

#[tokio::test]
async fn test_memory_is_bounded_and_clearable() {
    let mut sandbox = Sandbox::new();
    sandbox.config.memory.capacity = 4;
    let answers: Vec<String> = (0..5).map(|i| format!("reply {}", i)).collect();
    let refs: Vec<&str> = answers.iter().map(String::as_str).collect();
    let state = sandbox.state(FakeOracle::scripted(&refs));

    for i in 0..5 {
        state.session.handle_turn(&format!("msg {}", i)).await;
    }
    let (capacity, history) = state.session.history().await;
    assert_eq!(capacity, 4);
    let texts: Vec<_> = history.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["msg 3", "reply 3", "msg 4", "reply 4"]);

    state.session.forget().await;
    assert!(state.session.history().await.1.is_empty());
}

#[tokio::test]
async fn test_direct_dispatch_stringifies_params() {
    let sandbox = Sandbox::new();
    let state = sandbox.state(FakeOracle::scripted(&[]));

    let params = json!({ "volume": 75 });
    let env = state
        .session
        .direct_dispatch("music_volume", params.as_object().unwrap())
        .await;
    assert!(env.is_success());
    assert_eq!(env.data().unwrap()["volume"], 75);
}
