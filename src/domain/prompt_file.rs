//! YAML prompt files.
//!
//! A prompt file is either a mapping with a `slides` list, a top-level
//! list, or a single string. List items are strings or `{title, body}`
//! mappings; a title is prepended to its body with a blank line between.

use serde_yaml::Value;

use crate::error::SpawnerError;

/// Extracts prompt texts from a YAML document, in document order.
///
/// Blank items and items without a string `body` are skipped.
///
/// # Errors
///
/// Returns [`SpawnerError::Validation`] for empty input, malformed YAML,
/// or a document that yields no prompt.
pub fn parse_prompt_yaml(raw: &str) -> Result<Vec<String>, SpawnerError> {
    if raw.trim().is_empty() {
        return Err(SpawnerError::Validation("prompt file is empty".to_string()));
    }
    let document: Value = serde_yaml::from_str(raw)
        .map_err(|e| SpawnerError::Validation(format!("malformed prompt file: {e}")))?;

    let prompts: Vec<String> = match &document {
        Value::Mapping(map) => match map.get("slides") {
            Some(Value::Sequence(items)) => items.iter().filter_map(entry_prompt).collect(),
            _ => Vec::new(),
        },
        Value::Sequence(items) => items.iter().filter_map(entry_prompt).collect(),
        Value::String(text) => non_blank(text).into_iter().collect(),
        _ => Vec::new(),
    };

    if prompts.is_empty() {
        return Err(SpawnerError::Validation(
            "prompt file contains no prompts".to_string(),
        ));
    }
    Ok(prompts)
}

fn entry_prompt(entry: &Value) -> Option<String> {
    match entry {
        Value::String(text) => non_blank(text),
        Value::Mapping(map) => {
            let body = non_blank(map.get("body")?.as_str()?)?;
            match map.get("title").and_then(Value::as_str).and_then(non_blank) {
                Some(title) => Some(format!("{title}\n\n{body}")),
                None => Some(body),
            }
        }
        _ => None,
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
