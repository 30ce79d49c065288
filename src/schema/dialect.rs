use serde_json::{Map, Value as JsonValue};

use super::{default_description, CanonicalParameter, ParamKind};
use crate::core::error::GatewayError;

/// A raw parameter description tagged with the dialect it is written in.
#[derive(Debug, Clone, Copy)]
pub enum SchemaSource<'a> {
    /// `{name: {type, description, enum?, required?}}` (module `parameters`,
    /// script metadata).
    InlineMap(&'a JsonValue),
    /// `{type: "object", properties: {...}, required: [...]}` (module
    /// `inputSchema`).
    JsonSchema(&'a JsonValue),
    /// The `parameters:` block of a prompt's YAML frontmatter, same shape as
    /// `InlineMap`.
    Frontmatter(&'a JsonValue),
    /// `[{name, type, description, required, enum}]` from the prompts
    /// manifest.
    ManifestList(&'a JsonValue),
}

/// Normalize, logging and discarding conversion diagnostics.
pub fn normalize(source: SchemaSource<'_>) -> Vec<CanonicalParameter> {
    let (params, diagnostics) = normalize_with_diagnostics(source);
    for d in diagnostics {
        tracing::warn!(error = %d, "schema conversion");
    }
    params
}

/// Never fails: anything unrecognized degrades to `ParamKind::Any` and is
/// reported as a `SchemaConversion` diagnostic.
pub fn normalize_with_diagnostics(
    source: SchemaSource<'_>,
) -> (Vec<CanonicalParameter>, Vec<GatewayError>) {
    let mut diags = Vec::new();
    let params = match source {
        SchemaSource::InlineMap(raw) | SchemaSource::Frontmatter(raw) => match raw {
            JsonValue::Object(map) => inline_map(map, &mut diags),
            JsonValue::Null => Vec::new(),
            other => {
                diags.push(conversion("<root>", format!("expected a mapping, got {}", type_name(other))));
                Vec::new()
            }
        },
        SchemaSource::JsonSchema(raw) => match raw {
            JsonValue::Object(map) => json_schema_object(map, &mut diags),
            JsonValue::Null => Vec::new(),
            other => {
                diags.push(conversion("<root>", format!("expected an object schema, got {}", type_name(other))));
                Vec::new()
            }
        },
        SchemaSource::ManifestList(raw) => match raw {
            JsonValue::Array(items) => manifest_list(items, &mut diags),
            JsonValue::Null => Vec::new(),
            other => {
                diags.push(conversion("<root>", format!("expected a list, got {}", type_name(other))));
                Vec::new()
            }
        },
    };
    (params, diags)
}

fn inline_map(map: &Map<String, JsonValue>, diags: &mut Vec<GatewayError>) -> Vec<CanonicalParameter> {
    map.iter()
        .map(|(name, def)| property(name, def, None, diags))
        .collect()
}

fn json_schema_object(map: &Map<String, JsonValue>, diags: &mut Vec<GatewayError>) -> Vec<CanonicalParameter> {
    let Some(props) = map.get("properties") else {
        return Vec::new();
    };
    let Some(props) = props.as_object() else {
        diags.push(conversion("properties", "expected a mapping"));
        return Vec::new();
    };
    let listed = required_list(map);
    props
        .iter()
        .map(|(name, def)| {
            let in_list = listed.as_ref().map(|l| l.iter().any(|r| r == name));
            property(name, def, in_list, diags)
        })
        .collect()
}

fn manifest_list(items: &[JsonValue], diags: &mut Vec<GatewayError>) -> Vec<CanonicalParameter> {
    let mut out: Vec<CanonicalParameter> = Vec::new();
    for item in items {
        let Some(name) = item.get("name").and_then(JsonValue::as_str) else {
            diags.push(conversion("<unnamed>", "argument entry has no name"));
            continue;
        };
        if out.iter().any(|p| p.name == name) {
            diags.push(conversion(name, "duplicate argument name, keeping the first"));
            continue;
        }
        out.push(property(name, item, None, diags));
    }
    out
}

/// `listed` is membership in an enclosing JSON-Schema `required` array, when
/// one exists. A property-level `required: false` always wins.
fn property(
    name: &str,
    def: &JsonValue,
    listed: Option<bool>,
    diags: &mut Vec<GatewayError>,
) -> CanonicalParameter {
    let Some(obj) = def.as_object() else {
        diags.push(conversion(name, format!("definition is {}, not a mapping", type_name(def))));
        let mut p = CanonicalParameter::new(name, ParamKind::Any);
        p.required = listed.unwrap_or(true);
        return p;
    };

    let kind = match obj.get("type") {
        None => ParamKind::Any,
        Some(JsonValue::String(tag)) => ParamKind::from_tag(tag).unwrap_or_else(|| {
            diags.push(conversion(name, format!("unrecognized type '{tag}'")));
            ParamKind::Any
        }),
        Some(other) => {
            diags.push(conversion(name, format!("type tag is {}", type_name(other))));
            ParamKind::Any
        }
    };

    let required = match obj.get("required") {
        Some(JsonValue::Bool(false)) => false,
        Some(JsonValue::Bool(true)) => true,
        _ => listed.unwrap_or(true),
    };

    let description = obj
        .get("description")
        .and_then(JsonValue::as_str)
        .filter(|d| !d.trim().is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| default_description(name));

    let enum_values = obj.get("enum").and_then(JsonValue::as_array).map(|vals| {
        vals.iter()
            .map(|v| match v {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    });

    let item_kind = if kind == ParamKind::Array {
        obj.get("items")
            .and_then(|i| i.get("type"))
            .and_then(JsonValue::as_str)
            .map(|tag| ParamKind::from_tag(tag).unwrap_or(ParamKind::Any))
    } else {
        None
    };

    let object_shape = if kind == ParamKind::Object {
        obj.get("properties")
            .and_then(JsonValue::as_object)
            .map(|_| json_schema_object(obj, diags))
    } else {
        None
    };

    CanonicalParameter {
        name: name.to_owned(),
        kind,
        description,
        required,
        enum_values,
        item_kind,
        object_shape,
    }
}

fn required_list(map: &Map<String, JsonValue>) -> Option<Vec<String>> {
    map.get("required").and_then(JsonValue::as_array).map(|names| {
        names
            .iter()
            .filter_map(JsonValue::as_str)
            .map(str::to_owned)
            .collect()
    })
}

fn conversion(parameter: &str, reason: impl Into<String>) -> GatewayError {
    GatewayError::SchemaConversion {
        parameter: parameter.to_owned(),
        reason: reason.into(),
    }
}

fn type_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "a mapping",
    }
}
