//! `key=value` arguments for `aidectl exec`.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

/// Parse `key=value` pairs into a JSON parameter object.
///
/// Only the first `=` splits, so values may contain `=`. Values stay strings;
/// the daemon interprets them per action.
pub fn parse_params<S: AsRef<str>>(args: &[S]) -> Result<Map<String, Value>> {
    let mut params = Map::new();
    for arg in args {
        let arg = arg.as_ref();
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid parameter '{}': expected key=value", arg))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow!("Invalid parameter '{}': empty key", arg));
        }
        params.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(params)
}
