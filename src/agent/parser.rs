//! Action-call wire format
//!
//! The model requests actions by embedding a JSON object in its response:
//! either the batch shape `{"calls":[{"window_id","action_id","params"}]}`
//! or the single-call legacy shape `{"window_id","action_id","params"}`.
//! The parser scans for balanced JSON objects, accepts the first one that
//! looks like a call payload, and fails closed: a payload with any call
//! missing `window_id` or `action_id` invalidates the whole parse, never
//! yielding a partial batch.

use serde_json::Value;

/// One requested action call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCall {
    /// Target window id.
    pub window_id: String,
    /// Requested action id, possibly namespace-qualified.
    pub action_id: String,
    /// Parameters; `Value::Null` when omitted.
    pub params: Value,
}

/// Result of scanning a model response for action calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCalls {
    /// No recognizable call payload; the response is plain text.
    None,
    /// A valid payload with one or more calls, in issued order.
    Calls(Vec<ActionCall>),
    /// A payload was present but malformed. No call may execute.
    Invalid(String),
}

/// Scan a model response for an action-call payload.
///
/// # Example
/// ```
/// use casement::agent::{parse_action_calls, ParsedCalls};
///
/// let text = r#"On it. {"calls":[{"window_id":"w1","action_id":"reply","params":{"body":"hi"}}]}"#;
/// match parse_action_calls(text) {
///     ParsedCalls::Calls(calls) => assert_eq!(calls[0].action_id, "reply"),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
pub fn parse_action_calls(text: &str) -> ParsedCalls {
    for candidate in balanced_objects(text) {
        let value: Value = match serde_json::from_str(candidate) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let obj = match value.as_object() {
            Some(o) => o,
            None => continue,
        };
        let looks_like_payload = obj.contains_key("calls")
            || obj.contains_key("window_id")
            || obj.contains_key("action_id");
        if !looks_like_payload {
            continue;
        }
        return convert(&value);
    }
    ParsedCalls::None
}

fn convert(value: &Value) -> ParsedCalls {
    if let Some(calls) = value.get("calls") {
        let entries = match calls.as_array() {
            Some(a) => a,
            None => return ParsedCalls::Invalid("'calls' is not an array".to_string()),
        };
        if entries.is_empty() {
            return ParsedCalls::Invalid("'calls' is empty".to_string());
        }
        let mut parsed = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            match convert_call(entry) {
                Ok(call) => parsed.push(call),
                Err(reason) => {
                    return ParsedCalls::Invalid(format!("calls[{}]: {}", i, reason));
                }
            }
        }
        return ParsedCalls::Calls(parsed);
    }
    // Legacy single-call shape.
    match convert_call(value) {
        Ok(call) => ParsedCalls::Calls(vec![call]),
        Err(reason) => ParsedCalls::Invalid(reason),
    }
}

fn convert_call(value: &Value) -> Result<ActionCall, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "call is not an object".to_string())?;
    let window_id = obj
        .get("window_id")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing 'window_id'".to_string())?;
    let action_id = obj
        .get("action_id")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing 'action_id'".to_string())?;
    Ok(ActionCall {
        window_id: window_id.to_string(),
        action_id: action_id.to_string(),
        params: obj.get("params").cloned().unwrap_or(Value::Null),
    })
}

/// Top-level balanced `{...}` slices of `text`, respecting JSON strings.
fn balanced_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut slices = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
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
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        slices.push(&text[start..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_is_none() {
        assert_eq!(parse_action_calls("Just an answer."), ParsedCalls::None);
        assert_eq!(parse_action_calls(""), ParsedCalls::None);
    }

    #[test]
    fn test_irrelevant_json_is_none() {
        assert_eq!(
            parse_action_calls(r#"Here's data: {"foo": 1, "bar": [2, 3]}"#),
            ParsedCalls::None
        );
    }

    #[test]
    fn test_batch_shape() {
        let text = r#"{"calls":[
            {"window_id":"w1","action_id":"reply","params":{"body":"hi"}},
            {"window_id":"w2","action_id":"mail.archive"}
        ]}"#;
        let calls = match parse_action_calls(text) {
            ParsedCalls::Calls(c) => c,
            other => panic!("unexpected: {:?}", other),
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].window_id, "w1");
        assert_eq!(calls[0].params, json!({"body": "hi"}));
        assert_eq!(calls[1].action_id, "mail.archive");
        assert_eq!(calls[1].params, Value::Null);
    }

    #[test]
    fn test_legacy_single_shape() {
        let text = r#"{"window_id":"w1","action_id":"close","params":{"summary":"done"}}"#;
        let calls = match parse_action_calls(text) {
            ParsedCalls::Calls(c) => c,
            other => panic!("unexpected: {:?}", other),
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action_id, "close");
    }

    #[test]
    fn test_payload_embedded_in_prose() {
        let text = r#"I'll reply now.
```json
{"calls":[{"window_id":"w1","action_id":"reply","params":{"body":"ok"}}]}
```"#;
        assert!(matches!(parse_action_calls(text), ParsedCalls::Calls(_)));
    }

    #[test]
    fn test_missing_window_id_invalidates_whole_parse() {
        let text = r#"{"calls":[
            {"window_id":"w1","action_id":"reply"},
            {"action_id":"archive"}
        ]}"#;
        match parse_action_calls(text) {
            ParsedCalls::Invalid(reason) => assert!(reason.contains("calls[1]")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_string_action_id_invalid() {
        let text = r#"{"window_id":"w1","action_id":42}"#;
        assert!(matches!(parse_action_calls(text), ParsedCalls::Invalid(_)));
    }

    #[test]
    fn test_empty_calls_invalid() {
        assert!(matches!(
            parse_action_calls(r#"{"calls":[]}"#),
            ParsedCalls::Invalid(_)
        ));
    }

    #[test]
    fn test_calls_not_array_invalid() {
        assert!(matches!(
            parse_action_calls(r#"{"calls":"nope"}"#),
            ParsedCalls::Invalid(_)
        ));
    }

    #[test]
    fn test_braces_inside_strings_handled() {
        let text = r#"{"window_id":"w1","action_id":"reply","params":{"body":"use {braces} here"}}"#;
        let calls = match parse_action_calls(text) {
            ParsedCalls::Calls(c) => c,
            other => panic!("unexpected: {:?}", other),
        };
        assert_eq!(calls[0].params["body"], "use {braces} here");
    }

    #[test]
    fn test_first_payload_wins_after_skipping_non_payload() {
        let text = r#"{"note":"context"} then {"window_id":"w1","action_id":"go"}"#;
        let calls = match parse_action_calls(text) {
            ParsedCalls::Calls(c) => c,
            other => panic!("unexpected: {:?}", other),
        };
        assert_eq!(calls[0].action_id, "go");
    }
}
