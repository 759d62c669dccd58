use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Strip markdown fences and surrounding chatter, keeping the outermost
/// JSON object or array.
pub fn extract_json_block(raw: &str) -> &str {
    let trimmed = raw.trim();
    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if end >= start => &trimmed[start..=end],
        _ => trimmed,
    }
}

pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let block = extract_json_block(raw);
    serde_json::from_str(block).map_err(|e| {
        let preview: String = block.chars().take(120).collect();
        AppError::MalformedResponse(format!("{} (response began: {})", e, preview))
    })
}

/// Accepts `["a", "b"]`, `[{"title": "a"}]` or `{"ideas": [...]}`.
pub fn parse_titles(raw: &str) -> Result<Vec<String>> {
    let value: Value = parse_json(raw)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match ["ideas", "titles", "items"]
            .iter()
            .find_map(|key| map.remove(*key))
        {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AppError::MalformedResponse(
                    "expected a list of idea titles".to_string(),
                ))
            }
        },
        _ => {
            return Err(AppError::MalformedResponse(
                "expected a list of idea titles".to_string(),
            ))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(title) => Some(title),
            Value::Object(mut map) => match map.remove("title") {
                Some(Value::String(title)) => Some(title),
                _ => None,
            },
            _ => None,
        })
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .collect())
}
