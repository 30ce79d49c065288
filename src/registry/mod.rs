//! Capability Registry: one loaded configuration directory.
//!
//! `load_config` walks `Unloaded -> Loading -> Loaded | Failed`. Only a
//! missing or invalid top-level document fails the load; anything wrong
//! with an individual prompt, resource or tool becomes a warning and that
//! item is left out.

pub mod document;
pub mod prompts;
pub mod resources;
pub mod tools;

use std::path::{Path, PathBuf};

use crate::core::error::GatewayError;
use crate::core::mcp::ServerIdentity;
use crate::domain::{PromptCapability, ResourceCapability, ToolCapability};
use crate::infra::runtime::limits::ExecLimits;
use crate::tools::registry::PluginCatalog;

pub use document::{ConfigDocument, ConfigPaths};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug)]
pub struct CapabilityRegistry {
    state: LoadState,
    config_dir: Option<PathBuf>,
    document: Option<ConfigDocument>,
    prompts: Vec<PromptCapability>,
    resources: Vec<ResourceCapability>,
    tools: Vec<ToolCapability>,
    warnings: Vec<GatewayError>,
    catalog: PluginCatalog,
    limits: ExecLimits,
}

impl CapabilityRegistry {
    pub fn new(catalog: PluginCatalog, limits: ExecLimits) -> Self {
        Self {
            state: LoadState::Unloaded,
            config_dir: None,
            document: None,
            prompts: Vec::new(),
            resources: Vec::new(),
            tools: Vec::new(),
            warnings: Vec::new(),
            catalog,
            limits,
        }
    }

    /// Build and load in one step.
    pub async fn load(
        dir: &Path,
        catalog: PluginCatalog,
        limits: ExecLimits,
    ) -> Result<Self, GatewayError> {
        let mut registry = Self::new(catalog, limits);
        registry.load_config(dir).await?;
        Ok(registry)
    }

    /// Replace all state with a fresh load of `dir`.
    pub async fn load_config(&mut self, dir: &Path) -> Result<(), GatewayError> {
        self.state = LoadState::Loading;
        self.config_dir = Some(dir.to_path_buf());
        self.document = None;
        self.prompts.clear();
        self.resources.clear();
        self.tools.clear();
        self.warnings.clear();

        let doc = match document::read_document(dir).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "configuration load failed");
                self.state = LoadState::Failed;
                return Err(e);
            }
        };

        let paths = doc.paths.resolve(dir);
        if let Some(root) = &paths.prompts {
            let (items, warnings) = prompts::load_prompt_files(root).await;
            self.prompts = items;
            self.warnings.extend(warnings);
        }
        if let Some(root) = &paths.resources {
            let (items, warnings) = resources::load_resources(root).await;
            self.resources = items;
            self.warnings.extend(warnings);
        }
        if let Some(root) = &paths.tools {
            let (items, warnings) = tools::load_tools(dir, root, &self.catalog, self.limits).await;
            self.tools = items;
            self.warnings.extend(warnings);
        }

        // the manifest applies strictly after every scanned prompt is in place
        let manifest = dir.join(document::PROMPTS_MANIFEST);
        if tokio::fs::try_exists(&manifest).await.unwrap_or(false) {
            let prompts_dir = dir.join(document::MANIFEST_PROMPTS_DIR);
            let (items, warnings) = prompts::load_manifest(&manifest, &prompts_dir).await;
            prompts::merge_overrides(&mut self.prompts, items);
            self.warnings.extend(warnings);
        }

        tracing::info!(
            name = %doc.name,
            version = %doc.version,
            prompts = self.prompts.len(),
            resources = self.resources.len(),
            tools = self.tools.len(),
            warnings = self.warnings.len(),
            "configuration loaded"
        );
        self.document = Some(doc);
        self.state = LoadState::Loaded;
        Ok(())
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    pub fn document(&self) -> Option<&ConfigDocument> {
        self.document.as_ref()
    }

    /// Name and version from the loaded document.
    pub fn identity(&self) -> Option<ServerIdentity> {
        self.document.as_ref().map(|d| ServerIdentity {
            name: d.name.clone(),
            version: d.version.clone(),
        })
    }

    pub fn prompts(&self) -> &[PromptCapability] {
        &self.prompts
    }

    pub fn resources(&self) -> &[ResourceCapability] {
        &self.resources
    }

    pub fn tools(&self) -> &[ToolCapability] {
        &self.tools
    }

    /// Contained load-time problems, in the order they were found.
    pub fn warnings(&self) -> &[GatewayError] {
        &self.warnings
    }

    pub fn prompt(&self, id: &str) -> Option<&PromptCapability> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceCapability> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn tool(&self, id: &str) -> Option<&ToolCapability> {
        self.tools.iter().find(|t| t.id == id)
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new(PluginCatalog::with_builtins(), ExecLimits::default())
    }
}
