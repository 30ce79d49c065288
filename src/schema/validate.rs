use serde_json::Value as JsonValue;

use super::{CanonicalParameter, ParamKind};

/// Check invocation arguments against a parameter set.
///
/// `null` arguments count as an empty object and `null` values as absent.
/// Undeclared arguments are tolerated.
pub fn validate(params: &[CanonicalParameter], args: &JsonValue) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();
    match args {
        JsonValue::Null => check_object(params, &serde_json::Map::new(), "", &mut problems),
        JsonValue::Object(map) => check_object(params, map, "", &mut problems),
        other => problems.push(format!("arguments must be an object, got {other}")),
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

fn check_object(
    params: &[CanonicalParameter],
    map: &serde_json::Map<String, JsonValue>,
    prefix: &str,
    problems: &mut Vec<String>,
) {
    for p in params {
        let path = format!("{prefix}{}", p.name);
        match map.get(&p.name) {
            None | Some(JsonValue::Null) => {
                if p.required {
                    problems.push(format!("missing required parameter '{path}'"));
                }
            }
            Some(value) => check_value(p, value, &path, problems),
        }
    }
}

fn check_value(p: &CanonicalParameter, value: &JsonValue, path: &str, problems: &mut Vec<String>) {
    if !matches_kind(p.kind, value) {
        problems.push(format!("'{path}' must be {}", p.kind));
        return;
    }
    if let Some(allowed) = &p.enum_values {
        let as_text = match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !allowed.contains(&as_text) {
            problems.push(format!("'{path}' must be one of [{}]", allowed.join(", ")));
        }
    }
    if let (JsonValue::Array(items), Some(item_kind)) = (value, p.item_kind) {
        for (i, item) in items.iter().enumerate() {
            if !matches_kind(item_kind, item) {
                problems.push(format!("'{path}[{i}]' must be {item_kind}"));
            }
        }
    }
    if let (JsonValue::Object(inner), Some(shape)) = (value, &p.object_shape) {
        check_object(shape, inner, &format!("{path}."), problems);
    }
}

fn matches_kind(kind: ParamKind, value: &JsonValue) -> bool {
    match kind {
        ParamKind::Any => true,
        ParamKind::String => value.is_string(),
        ParamKind::Number => value.is_number(),
        ParamKind::Integer => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        ParamKind::Boolean => value.is_boolean(),
        ParamKind::Array => value.is_array(),
        ParamKind::Object => value.is_object(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{normalize, SchemaSource};
    use serde_json::json;

    fn calculator() -> Vec<CanonicalParameter> {
        let raw = json!({
            "type": "object",
            "properties": {
                "operation": { "type": "string", "enum": ["add", "subtract"] },
                "a": { "type": "number" },
                "b": { "type": "number" },
                "precision": { "type": "integer" }
            },
            "required": ["operation", "a", "b"]
        });
        normalize(SchemaSource::JsonSchema(&raw))
    }

    #[test]
    fn accepts_conforming_arguments() {
        let params = calculator();
        assert!(validate(&params, &json!({ "operation": "add", "a": 2, "b": 3.5 })).is_ok());
        assert!(validate(&params, &json!({ "operation": "add", "a": 2, "b": 3, "precision": 2.0 })).is_ok());
    }

    #[test]
    fn reports_missing_wrong_type_and_enum() {
        let params = calculator();
        let problems = validate(&params, &json!({ "operation": "pow", "a": "2" })).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("'operation' must be one of [add, subtract]")));
        assert!(problems.iter().any(|p| p.contains("'a' must be number")));
        assert!(problems.iter().any(|p| p.contains("missing required parameter 'b'")));
    }

    #[test]
    fn null_arguments_are_an_empty_object() {
        let params = normalize(SchemaSource::InlineMap(&json!({ "x": { "required": false } })));
        assert!(validate(&params, &JsonValue::Null).is_ok());
        assert!(validate(&params, &json!("oops")).is_err());
    }

    #[test]
    fn checks_array_items_and_nested_objects() {
        let raw = json!({
            "ids": { "type": "array", "items": { "type": "integer" } },
            "opts": { "type": "object", "properties": { "depth": { "type": "integer" } } }
        });
        let params = normalize(SchemaSource::InlineMap(&raw));
        let problems = validate(&params, &json!({ "ids": [1, "two"], "opts": {} })).unwrap_err();
        assert_eq!(problems, vec![
            "'ids[1]' must be integer".to_string(),
            "missing required parameter 'opts.depth'".to_string(),
        ]);
    }
}
