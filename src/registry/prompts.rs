//! Prompt loading: `.md` files with optional YAML frontmatter, then the
//! central `prompts.yaml` manifest merged over them.

use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::core::error::GatewayError;
use crate::discovery::{self, ScanKind};
use crate::domain::PromptCapability;
use crate::schema::{normalize, CanonicalParameter, SchemaSource};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedPrompt {
    pub body: String,
    pub parameters: Vec<CanonicalParameter>,
    pub metadata: Map<String, JsonValue>,
}

/// Split frontmatter from the body. Frontmatter that isn't a YAML mapping is
/// dropped with a warning, but the body is still stripped of it.
pub fn parse_prompt(text: &str) -> ParsedPrompt {
    let Some((front, body)) = split_frontmatter(text) else {
        return ParsedPrompt { body: text.to_owned(), ..Default::default() };
    };
    let mut parsed = ParsedPrompt { body: body.to_owned(), ..Default::default() };
    match serde_yaml::from_str::<JsonValue>(front) {
        Ok(JsonValue::Object(mut map)) => {
            if let Some(params) = map.remove("parameters") {
                parsed.parameters = normalize(SchemaSource::Frontmatter(&params));
            }
            parsed.metadata = map;
        }
        Ok(JsonValue::Null) => {}
        Ok(_) => tracing::warn!("frontmatter is not a mapping, ignoring"),
        Err(e) => tracing::warn!(error = %e, "error parsing frontmatter, ignoring"),
    }
    parsed
}

fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---\n")?;
    if let Some(end) = rest.find("\n---\n") {
        return Some((&rest[..end], &rest[end + 5..]));
    }
    // closing fence at end of file, empty body
    rest.strip_suffix("\n---").map(|front| (front, ""))
}

/// Every `.md` under `root`, keyed by relative path without extension.
pub async fn load_prompt_files(root: &Path) -> (Vec<PromptCapability>, Vec<GatewayError>) {
    let mut warnings = Vec::new();
    let found = discovery::scan(root, ScanKind::Prompts).await;
    if found.missing_root {
        warnings.push(GatewayError::component(root, "prompts directory not found"));
    }
    let mut prompts = Vec::with_capacity(found.paths.len());
    for path in found.paths {
        let Some(id) = discovery::capability_id(root, &path) else {
            continue;
        };
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "error loading prompt file");
                warnings.push(GatewayError::component(&path, e));
                continue;
            }
        };
        let parsed = parse_prompt(&text);
        prompts.push(PromptCapability {
            id,
            source_path: path,
            body_template: parsed.body,
            parameters: parsed.parameters,
            metadata: parsed.metadata,
        });
    }
    (prompts, warnings)
}

/// Entries of `prompts.yaml`; each `file` is read from `prompts_dir`.
pub async fn load_manifest(
    manifest: &Path,
    prompts_dir: &Path,
) -> (Vec<PromptCapability>, Vec<GatewayError>) {
    let mut warnings = Vec::new();
    let doc: JsonValue = match tokio::fs::read_to_string(manifest).await {
        Ok(text) => match serde_yaml::from_str(&text) {
            Ok(doc) => doc,
            Err(e) => {
                warnings.push(GatewayError::component(manifest, e));
                return (Vec::new(), warnings);
            }
        },
        Err(e) => {
            warnings.push(GatewayError::component(manifest, e));
            return (Vec::new(), warnings);
        }
    };
    let Some(entries) = doc.get("prompts").and_then(JsonValue::as_array) else {
        tracing::warn!(path = %manifest.display(), "manifest does not contain a prompts list");
        warnings.push(GatewayError::component(manifest, "does not contain a valid prompts list"));
        return (Vec::new(), warnings);
    };

    let mut prompts = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let (Some(id), Some(file)) = (
            entry.get("id").and_then(JsonValue::as_str),
            entry.get("file").and_then(JsonValue::as_str),
        ) else {
            warnings.push(GatewayError::component(
                manifest,
                format!("prompt entry {idx} is missing 'id' or 'file'"),
            ));
            continue;
        };
        let path = prompts_dir.join(file);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not load manifest prompt file");
                warnings.push(GatewayError::component(&path, e));
                continue;
            }
        };
        let arguments = entry.get("arguments").cloned().unwrap_or(JsonValue::Null);
        prompts.push(PromptCapability {
            id: id.to_owned(),
            source_path: path,
            body_template: parse_prompt(&text).body,
            parameters: normalize(SchemaSource::ManifestList(&arguments)),
            metadata: manifest_metadata(id, entry),
        });
    }
    (prompts, warnings)
}

fn manifest_metadata(id: &str, entry: &JsonValue) -> Map<String, JsonValue> {
    let mut meta = Map::new();
    for key in ["description", "category", "tags", "author"] {
        if let Some(v) = entry.get(key).filter(|v| !v.is_null()) {
            meta.insert(key.to_owned(), v.clone());
        }
    }
    let enabled = entry.get("enabled").and_then(JsonValue::as_bool).unwrap_or(true);
    meta.insert("enabled".into(), JsonValue::Bool(enabled));
    let name = entry.get("name").and_then(JsonValue::as_str).unwrap_or(id);
    meta.insert("name".into(), JsonValue::String(name.to_owned()));
    meta
}

/// Last writer wins: an override replaces the prompt with the same id in
/// place, otherwise it is appended.
pub fn merge_overrides(base: &mut Vec<PromptCapability>, overrides: Vec<PromptCapability>) {
    for prompt in overrides {
        match base.iter_mut().find(|p| p.id == prompt.id) {
            Some(slot) => *slot = prompt,
            None => base.push(prompt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamKind;

    #[test]
    fn frontmatter_is_split_into_metadata_and_parameters() {
        let text = "---\ndescription: Review code\ntags: [rust]\nparameters:\n  language:\n    type: string\n    enum: [rust, go]\n  strict:\n    type: boolean\n    required: false\n---\nReview this {{language}} code.\n";
        let p = parse_prompt(text);
        assert_eq!(p.body, "Review this {{language}} code.\n");
        assert_eq!(p.metadata["description"], "Review code");
        assert!(!p.metadata.contains_key("parameters"));
        assert_eq!(p.parameters.len(), 2);
        assert_eq!(p.parameters[0].enum_values.as_ref().map(Vec::len), Some(2));
        assert_eq!(p.parameters[1].kind, ParamKind::Boolean);
        assert!(!p.parameters[1].required);
    }

    #[test]
    fn text_without_frontmatter_is_the_body() {
        let p = parse_prompt("Just text\n---\nnot front\n");
        assert_eq!(p.body, "Just text\n---\nnot front\n");
        assert!(p.metadata.is_empty());
    }

    #[test]
    fn broken_frontmatter_still_strips_the_block() {
        let p = parse_prompt("---\ndescription: [unclosed\n---\nBody\n");
        assert_eq!(p.body, "Body\n");
        assert!(p.metadata.is_empty());
        assert!(p.parameters.is_empty());
    }

    #[test]
    fn fence_at_end_of_file_means_empty_body() {
        let p = parse_prompt("---\nauthor: me\n---");
        assert_eq!(p.body, "");
        assert_eq!(p.metadata["author"], "me");
    }

    fn prompt(id: &str, body: &str) -> PromptCapability {
        PromptCapability {
            id: id.into(),
            source_path: id.into(),
            body_template: body.into(),
            parameters: vec![],
            metadata: Map::new(),
        }
    }

    #[test]
    fn overrides_replace_in_place_and_append_new() {
        let mut base = vec![prompt("foo", "file"), prompt("bar", "file")];
        merge_overrides(&mut base, vec![prompt("foo", "manifest"), prompt("baz", "manifest")]);
        let ids: Vec<&str> = base.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["foo", "bar", "baz"]);
        assert_eq!(base[0].body_template, "manifest");
    }

    #[tokio::test]
    async fn manifest_entries_load_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prompts_dir = dir.path().join("prompts");
        std::fs::create_dir_all(&prompts_dir).unwrap();
        std::fs::write(prompts_dir.join("greet.md"), "---\ndescription: ignored\n---\nHi {{who}}").unwrap();
        let manifest = dir.path().join("prompts.yaml");
        std::fs::write(
            &manifest,
            "prompts:\n  - id: greet\n    file: greet.md\n    description: Greeting\n    arguments:\n      - name: who\n        type: string\n  - id: orphan\n    file: missing.md\n  - file: no-id.md\n",
        )
        .unwrap();

        let (prompts, warnings) = load_manifest(&manifest, &prompts_dir).await;
        assert_eq!(prompts.len(), 1);
        assert_eq!(warnings.len(), 2);
        let greet = &prompts[0];
        assert_eq!(greet.body_template, "Hi {{who}}");
        assert_eq!(greet.metadata["description"], "Greeting");
        assert_eq!(greet.metadata["enabled"], true);
        assert_eq!(greet.metadata["name"], "greet");
        assert_eq!(greet.parameters[0].name, "who");
    }

    #[tokio::test]
    async fn manifest_without_prompts_list_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("prompts.yaml");
        std::fs::write(&manifest, "other: 1\n").unwrap();
        let (prompts, warnings) = load_manifest(&manifest, dir.path()).await;
        assert!(prompts.is_empty());
        assert!(matches!(warnings[0], GatewayError::ComponentLoad { .. }));
    }
}
