//! 响应数据中的文本提取

use serde_json::Value;

/// Pull the text out of a config-text response.
///
/// Accepts a plain string, an array of string fragments (joined as-is), an object with a
/// `text` member, or null (empty text). Anything else has no text.
pub fn extract_text(data: &Value) -> Option<String> {
    match data {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => parts
            .iter()
            .map(Value::as_str)
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.concat()),
        Value::Object(map) => map.get("text").and_then(extract_text),
        Value::Bool(_) | Value::Number(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_known_shapes() {
        assert_eq!(extract_text(&json!("a\nb")).as_deref(), Some("a\nb"));
        assert_eq!(extract_text(&json!(["a\n", "b"])).as_deref(), Some("a\nb"));
        assert_eq!(extract_text(&json!({ "text": "x" })).as_deref(), Some("x"));
        assert_eq!(extract_text(&Value::Null).as_deref(), Some(""));
    }

    #[test]
    fn rejects_other_shapes() {
        assert_eq!(extract_text(&json!(1)), None);
        assert_eq!(extract_text(&json!(["a", 2])), None);
        assert_eq!(extract_text(&json!({ "lines": [] })), None);
    }
}
