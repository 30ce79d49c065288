use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};

use super::{CanonicalParameter, ParamKind};

const JSON_SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";

/// JSON-Schema object describing a tool's input, as listed to clients.
pub fn to_json_schema(params: &[CanonicalParameter]) -> JsonValue {
    let mut schema = object_schema(params);
    schema.insert("additionalProperties".into(), JsonValue::Bool(false));
    schema.insert("$schema".into(), JsonValue::String(JSON_SCHEMA_DRAFT.into()));
    JsonValue::Object(schema)
}

fn object_schema(params: &[CanonicalParameter]) -> Map<String, JsonValue> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for p in params {
        properties.insert(p.name.clone(), property_schema(p));
        if p.required {
            required.push(JsonValue::String(p.name.clone()));
        }
    }
    let mut out = Map::new();
    out.insert("type".into(), json!("object"));
    out.insert("properties".into(), JsonValue::Object(properties));
    out.insert("required".into(), JsonValue::Array(required));
    out
}

fn property_schema(p: &CanonicalParameter) -> JsonValue {
    let mut prop = match (&p.kind, &p.object_shape) {
        (ParamKind::Object, Some(shape)) => object_schema(shape),
        _ => Map::new(),
    };
    // `any` has no JSON-Schema type keyword
    if p.kind != ParamKind::Any {
        prop.insert("type".into(), json!(p.kind.as_str()));
    }
    prop.insert("description".into(), json!(p.description));
    if let Some(values) = &p.enum_values {
        prop.insert("enum".into(), json!(values));
    }
    if let Some(item) = p.item_kind.filter(|k| *k != ParamKind::Any) {
        prop.insert("items".into(), json!({ "type": item.as_str() }));
    }
    JsonValue::Object(prop)
}

/// One prompt argument as listed to clients, with its declared type kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptArgumentSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

pub fn to_prompt_arguments(params: &[CanonicalParameter]) -> Vec<PromptArgumentSpec> {
    params
        .iter()
        .map(|p| PromptArgumentSpec {
            name: p.name.clone(),
            description: p.description.clone(),
            required: p.required,
            kind: match p.kind {
                ParamKind::Any => "string".to_owned(),
                k => k.as_str().to_owned(),
            },
            enum_values: p.enum_values.clone(),
        })
        .collect()
}
