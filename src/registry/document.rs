use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::GatewayError;

pub const CONFIG_FILE: &str = "mcp-config.yaml";
pub const PROMPTS_MANIFEST: &str = "prompts.yaml";
/// Manifest `file` entries resolve against this directory under the root,
/// whatever `paths.prompts` says.
pub const MANIFEST_PROMPTS_DIR: &str = "prompts";

/// Top-level `mcp-config.yaml`. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub paths: ConfigPaths,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigPaths {
    #[serde(default)]
    pub prompts: Option<String>,
    #[serde(default)]
    pub resources: Option<String>,
    #[serde(default)]
    pub tools: Option<String>,
}

impl ConfigPaths {
    pub fn resolve(&self, root: &Path) -> ResolvedPaths {
        ResolvedPaths {
            prompts: self.prompts.as_ref().map(|p| root.join(p)),
            resources: self.resources.as_ref().map(|p| root.join(p)),
            tools: self.tools.as_ref().map(|p| root.join(p)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPaths {
    pub prompts: Option<PathBuf>,
    pub resources: Option<PathBuf>,
    pub tools: Option<PathBuf>,
}

/// Read and shape-check `<dir>/mcp-config.yaml`.
pub async fn read_document(dir: &Path) -> Result<ConfigDocument, GatewayError> {
    if !tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(GatewayError::ConfigNotFound { path: dir.to_path_buf() });
    }
    let path = dir.join(CONFIG_FILE);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GatewayError::ConfigNotFound { path });
        }
        Err(e) => return Err(GatewayError::InvalidConfig { path, reason: e.to_string() }),
    };
    parse_document(&text).map_err(|reason| GatewayError::InvalidConfig { path, reason })
}

pub fn parse_document(text: &str) -> Result<ConfigDocument, String> {
    let doc: ConfigDocument = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    if doc.name.trim().is_empty() {
        return Err("'name' must not be empty".into());
    }
    Ok(doc)
}
