//! Two-stage JSON recovery for free-form model output.
//!
//! Stage one parses the substring between the first `{` and the last `}` (models
//! like to wrap JSON in prose or code fences). Stage two parses the whole text.

use serde_json::{Map, Value};

use crate::llm_client::CompletionError;

pub type JsonObject = Map<String, Value>;

/// Stage one: the first `{` .. last `}` substring, parsed as an object.
pub fn parse_bracketed(text: &str) -> Option<JsonObject> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    parse_object(&text[start..=end])
}

/// Stage two: the whole text, parsed as an object.
pub fn parse_whole(text: &str) -> Option<JsonObject> {
    parse_object(text.trim())
}

fn parse_object(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Runs both stages in order. An empty object counts as a failure.
pub fn extract_json_object(text: &str) -> Result<JsonObject, CompletionError> {
    parse_bracketed(text)
        .filter(|map| !map.is_empty())
        .or_else(|| parse_whole(text).filter(|map| !map.is_empty()))
        .ok_or_else(|| {
            let preview: String = text.chars().take(120).collect();
            CompletionError::Malformed(format!("no JSON object found in model output: {preview:?}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracketed_with_prose_around() {
        let text = "Sure! Here is the analysis:\n{\"general_suggestions\": [\"a\"]}\nHope it helps.";
        let map = parse_bracketed(text).unwrap();
        assert_eq!(map["general_suggestions"][0], "a");
    }

    #[test]
    fn test_bracketed_inside_code_fence() {
        let text = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(parse_bracketed(text).unwrap()["key"], "value");
    }

    #[test]
    fn test_bracketed_rejects_trailing_brace_noise() {
        let text = "{\"a\": 1} and then a stray } here";
        assert!(parse_bracketed(text).is_none());
    }

    #[test]
    fn test_whole_text_requires_object() {
        assert!(parse_whole("[1, 2]").is_none());
        assert_eq!(parse_whole("  {\"a\": true}  ").unwrap()["a"], true);
    }

    #[test]
    fn test_no_braces() {
        assert!(parse_bracketed("no json here").is_none());
        assert!(matches!(
            extract_json_object("no json here"),
            Err(CompletionError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_object_is_malformed() {
        assert!(matches!(
            extract_json_object("Result: {}"),
            Err(CompletionError::Malformed(_))
        ));
    }

    #[test]
    fn test_reversed_braces() {
        assert!(parse_bracketed("} oops {").is_none());
    }
}
