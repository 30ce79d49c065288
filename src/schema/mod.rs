//! Canonical parameter schema shared by every capability kind.
//!
//! Four on-disk dialects describe parameters (see [`SchemaSource`]); all of
//! them normalize into an ordered list of [`CanonicalParameter`]s. From there
//! the schema is exported as JSON Schema (tools) or prompt arguments, and
//! [`validate`] checks invocation arguments against it.

mod dialect;
mod export;
mod validate;

pub use dialect::{normalize, normalize_with_diagnostics, SchemaSource};
pub use export::{to_json_schema, to_prompt_arguments, PromptArgumentSpec};
pub use validate::validate;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

impl ParamKind {
    /// Resolve a dialect type tag. `None` for tags this crate doesn't know.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(ParamKind::String),
            "number" => Some(ParamKind::Number),
            "integer" => Some(ParamKind::Integer),
            "boolean" => Some(ParamKind::Boolean),
            "array" => Some(ParamKind::Array),
            "object" => Some(ParamKind::Object),
            "any" => Some(ParamKind::Any),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
            ParamKind::Any => "any",
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalParameter {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
    pub enum_values: Option<Vec<String>>,
    /// Element kind, only for `Array`.
    pub item_kind: Option<ParamKind>,
    /// Declared properties, only for `Object`. Order follows the source.
    pub object_shape: Option<Vec<CanonicalParameter>>,
}

impl CanonicalParameter {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        let name = name.into();
        Self {
            description: default_description(&name),
            name,
            kind,
            required: true,
            enum_values: None,
            item_kind: None,
            object_shape: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

pub(crate) fn default_description(name: &str) -> String {
    format!("Parameter: {name}")
}
