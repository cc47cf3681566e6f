//! Extracts an action from free-form oracle text.
//!
//! The oracle is asked to answer with a JSON object of the form
//! `{"action": "...", "params": {...}, "response": "..."}`, but it often
//! wraps it in prose or a code fence. Braces are paired in a single
//! string-aware pass and candidates are tried in order of their opening
//! brace; the first balanced block that decodes into an object with a
//! string `action` field wins. Anything else is plain conversation.

use aide_common::{stringify_params, ActionDescriptor};
use serde_json::Value;

/// Largest candidate block considered, in bytes
pub const MAX_CANDIDATE_BYTES: usize = 64 * 1024;

/// Extra passes allowed after an unclosed brace swallowed a quoted section
const MAX_RESCANS: usize = 8;

/// Parse the first valid action block in `text`
pub fn parse(text: &str) -> Option<ActionDescriptor> {
    let bytes = text.as_bytes();
    let mut blocks = Vec::new();
    let mut from = 0;

    for _ in 0..=MAX_RESCANS {
        let pass = scan(bytes, from);
        blocks.extend(pass.blocks);
        match pass.rescan_from {
            Some(next) => from = next,
            None => break,
        }
    }

    // a brace reached by two passes closes at the same place in both
    blocks.sort_unstable();
    blocks.dedup_by_key(|(start, _)| *start);

    blocks
        .into_iter()
        .find_map(|(start, end)| decode(&text[start..end], text))
}

struct Pass {
    /// (start, end) byte ranges of balanced blocks within the size limit
    blocks: Vec<(usize, usize)>,
    /// Where a fresh pass must start to see braces an unclosed block hid
    rescan_from: Option<usize>,
}

/// One linear pass pairing braces with a stack. Quotes only open a JSON
/// string inside a block; outside one they are prose.
fn scan(bytes: &[u8], from: usize) -> Pass {
    let mut open: Vec<usize> = Vec::new();
    let mut blocks = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut quoted = false;

    for (i, &b) in bytes.iter().enumerate().skip(from) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if !open.is_empty() => {
                in_string = true;
                quoted = true;
            }
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    if i + 1 - start <= MAX_CANDIDATE_BYTES {
                        blocks.push((start, i + 1));
                    }
                    if open.is_empty() {
                        quoted = false;
                    }
                }
            }
            _ => {}
        }
    }

    // without quotes a fresh pass would pair the same braces
    let rescan_from = open.first().filter(|_| quoted).map(|&start| start + 1);
    Pass { blocks, rescan_from }
}

fn decode(candidate: &str, origin: &str) -> Option<ActionDescriptor> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let object = value.as_object()?;
    let kind = object.get("action")?.as_str()?;

    let mut descriptor = ActionDescriptor::new(kind.trim());
    if let Some(params) = object.get("params").and_then(Value::as_object) {
        descriptor.parameters = stringify_params(params);
    }
    descriptor.reply = object
        .get("response")
        .and_then(Value::as_str)
        .map(str::to_string);
    descriptor.origin_text = origin.to_string();
    Some(descriptor)
}
