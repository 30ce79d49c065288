//! Tool return value -> protocol content items.

use serde_json::{json, Value as JsonValue};

/// Content sequence produced by a tool call, as wire-shaped JSON items.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: Vec<JsonValue>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: Vec<JsonValue>) -> Self {
        Self { content, is_error: false }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { content: vec![text_item(message)], is_error: true }
    }
}

pub fn text_item(text: impl Into<String>) -> JsonValue {
    json!({ "type": "text", "text": text.into() })
}

/// string -> one text item; array -> one text item per element;
/// object with `content` -> passed through; other objects -> pretty JSON.
pub fn normalize_result(value: JsonValue) -> Vec<JsonValue> {
    match value {
        JsonValue::String(s) => vec![text_item(s)],
        JsonValue::Array(items) => items.into_iter().map(|v| text_item(stringify(&v))).collect(),
        JsonValue::Object(mut obj) => match obj.remove("content") {
            Some(JsonValue::Array(items)) => items,
            Some(other) => vec![other],
            None => {
                let pretty = serde_json::to_string_pretty(&JsonValue::Object(obj))
                    .unwrap_or_default();
                vec![text_item(pretty)]
            }
        },
        other => vec![text_item(stringify(&other))],
    }
}

fn stringify(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_becomes_single_text_item() {
        assert_eq!(normalize_result(json!("olleh")), vec![text_item("olleh")]);
    }

    #[test]
    fn array_elements_are_stringified() {
        let out = normalize_result(json!(["a", 2, true]));
        assert_eq!(out, vec![text_item("a"), text_item("2"), text_item("true")]);
    }

    #[test]
    fn content_field_passes_through() {
        let items = json!([{ "type": "image", "data": "AAA", "mimeType": "image/png" }]);
        let out = normalize_result(json!({ "content": items.clone() }));
        assert_eq!(JsonValue::Array(out), items);
    }

    #[test]
    fn plain_object_is_pretty_printed() {
        let out = normalize_result(json!({ "length": 5 }));
        assert_eq!(out[0]["text"], "{\n  \"length\": 5\n}");
    }

    #[test]
    fn scalars_are_stringified() {
        assert_eq!(normalize_result(json!(5)), vec![text_item("5")]);
        assert_eq!(normalize_result(JsonValue::Null), vec![text_item("null")]);
    }
}
