//! Extraction of user-visible text from request/response JSON bodies. Both
//! provider shapes are supported; anything that doesn't parse as recognized
//! JSON is scanned as raw bytes instead, so a malformed body is never
//! silently skipped.

use serde_json::Value;

/// Pulls every scannable string out of an OpenAI- or Anthropic-shaped chat
/// body: top-level `messages[*].content` (string or an array of content
/// parts with a `text` field), plus a top-level `system` string or array.
/// Concatenated with newlines; order doesn't matter to the fast path, and
/// the NLP path treats the whole thing as one span.
pub fn extract_request_text(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return String::from_utf8_lossy(body).into_owned();
    };
    let mut chunks = Vec::new();
    if let Some(system) = value.get("system") {
        collect_content(system, &mut chunks);
    }
    if let Some(messages) = value.get("messages").and_then(Value::as_array) {
        for message in messages {
            if let Some(content) = message.get("content") {
                collect_content(content, &mut chunks);
            }
        }
    }
    chunks.join("\n")
}

fn collect_content(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(parts) => {
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    out.push(text.to_string());
                } else if let Some(s) = part.as_str() {
                    out.push(s.to_string());
                }
            }
        }
        _ => {}
    }
}

/// Extracts assistant-visible text from a buffered (non-streaming) response
/// body. Providers vary in shape here (OpenAI `choices[*].message.content`,
/// Anthropic `content[*].text`, or a bare `text` field) so all three are
/// tried.
pub fn extract_response_text(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return String::from_utf8_lossy(body).into_owned();
    };
    let mut chunks = Vec::new();
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        chunks.push(text.to_string());
    }
    if let Some(choices) = value.get("choices").and_then(Value::as_array) {
        for choice in choices {
            if let Some(content) = choice.get("message").and_then(|m| m.get("content")) {
                collect_content(content, &mut chunks);
            }
        }
    }
    if let Some(content) = value.get("content").and_then(Value::as_array) {
        collect_content(&Value::Array(content.clone()), &mut chunks);
    }
    chunks.join("\n")
}

/// Extracts the incremental assistant text from a single SSE `data:` frame's
/// JSON payload. Returns `None` for non-content frames (role deltas,
/// `[DONE]`, pings) so the streaming scanner can pass them through unscanned.
pub fn extract_sse_delta_text(data: &str) -> Option<String> {
    if data.trim() == "[DONE]" {
        return None;
    }
    let value: Value = serde_json::from_str(data).ok()?;
    if let Some(text) = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
    {
        return Some(text.to_string());
    }
    if value.get("type").and_then(Value::as_str) == Some("content_block_delta") {
        if let Some(text) = value
            .get("delta")
            .and_then(|d| d.get("text"))
            .and_then(Value::as_str)
        {
            return Some(text.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_string_content() {
        let body = br#"{"model":"gpt-4","messages":[{"role":"user","content":"hello there"}]}"#;
        assert_eq!(extract_request_text(body), "hello there");
    }

    #[test]
    fn extracts_content_parts() {
        let body = br#"{"messages":[{"role":"user","content":[{"type":"text","text":"part one"},{"type":"text","text":"part two"}]}]}"#;
        let text = extract_request_text(body);
        assert!(text.contains("part one"));
        assert!(text.contains("part two"));
    }

    #[test]
    fn extracts_system_prompt() {
        let body = br#"{"system":"be nice","messages":[]}"#;
        assert!(extract_request_text(body).contains("be nice"));
    }

    #[test]
    fn extracts_openai_sse_delta() {
        let data = r#"{"choices":[{"delta":{"content":"hel"}}]}"#;
        assert_eq!(extract_sse_delta_text(data), Some("hel".to_string()));
    }

    #[test]
    fn extracts_anthropic_sse_delta() {
        let data = r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"lo"}}"#;
        assert_eq!(extract_sse_delta_text(data), Some("lo".to_string()));
    }

    #[test]
    fn done_frame_extracts_nothing() {
        assert_eq!(extract_sse_delta_text("[DONE]"), None);
    }

    #[test]
    fn extracts_buffered_response_text() {
        let body = br#"{"text":"contact me at jane.doe@example.com"}"#;
        assert!(extract_response_text(body).contains("jane.doe@example.com"));
    }
}
