//! Tool loading. Module descriptors register first; a script whose
//! filename-derived id is already taken is skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::error::GatewayError;
use crate::discovery::{self, ScanKind};
use crate::domain::{ToolCapability, ToolInvoker};
use crate::infra::runtime::limits::ExecLimits;
use crate::tools::module::parse_descriptor;
use crate::tools::registry::PluginCatalog;
use crate::tools::script::ScriptTool;

/// `config_root` anchors the relative paths used in generated descriptions.
pub async fn load_tools(
    config_root: &Path,
    tools_root: &Path,
    catalog: &PluginCatalog,
    limits: ExecLimits,
) -> (Vec<ToolCapability>, Vec<GatewayError>) {
    let mut warnings = Vec::new();
    let mut tools: Vec<ToolCapability> = Vec::new();
    let mut owners: HashMap<String, PathBuf> = HashMap::new();

    let modules = discovery::scan(tools_root, ScanKind::ToolModules).await;
    if modules.missing_root {
        warnings.push(GatewayError::component(tools_root, "tools directory not found"));
        return (tools, warnings);
    }
    for path in modules.paths {
        match load_module(config_root, &path, catalog).await {
            Ok(tool) => {
                if let Some(owner) = owners.get(&tool.id) {
                    warnings.push(duplicate(&path, &tool.id, owner));
                    continue;
                }
                owners.insert(tool.id.clone(), path);
                tools.push(tool);
            }
            Err(e) => {
                tracing::warn!(error = %e, "error loading tool module");
                warnings.push(e);
            }
        }
    }

    let scripts = discovery::scan(tools_root, ScanKind::ToolScripts).await;
    for path in scripts.paths {
        let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
            continue;
        };
        if let Some(owner) = owners.get(&id) {
            tracing::warn!(tool = %id, script = %path.display(), "tool id already registered, skipping script");
            warnings.push(duplicate(&path, &id, owner));
            continue;
        }
        match load_script(config_root, &path, &id, limits).await {
            Ok(tool) => {
                owners.insert(id, path);
                tools.push(tool);
            }
            Err(e) => {
                tracing::warn!(error = %e, "error loading shell script");
                warnings.push(e);
            }
        }
    }

    (tools, warnings)
}

async fn load_module(
    config_root: &Path,
    path: &Path,
    catalog: &PluginCatalog,
) -> Result<ToolCapability, GatewayError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| GatewayError::component(path, e))?;
    let descriptor = parse_descriptor(path, &text).map_err(|reason| GatewayError::component(path, reason))?;
    let handler = catalog.get(&descriptor.handler).ok_or_else(|| {
        GatewayError::component(
            path,
            format!("handler '{}' is not a registered plugin", descriptor.handler),
        )
    })?;
    let relative = discovery::relative_posix(config_root, path);
    Ok(ToolCapability {
        id: descriptor.name,
        source_path: path.to_path_buf(),
        description: descriptor
            .description
            .unwrap_or_else(|| format!("Tool from {relative}")),
        parameters: descriptor.parameters,
        invoker: ToolInvoker::InProcess(handler),
    })
}

async fn load_script(
    config_root: &Path,
    path: &Path,
    id: &str,
    limits: ExecLimits,
) -> Result<ToolCapability, GatewayError> {
    let script = ScriptTool::new(id, path, limits);
    script
        .ensure_executable()
        .await
        .map_err(|e| GatewayError::component(path, format!("cannot make executable: {e}")))?;
    let relative = discovery::relative_posix(config_root, path);
    let meta = script.negotiate(&relative).await;
    Ok(ToolCapability {
        id: id.to_owned(),
        source_path: path.to_path_buf(),
        description: meta.description,
        parameters: meta.parameters,
        invoker: ToolInvoker::Script(script),
    })
}

fn duplicate(path: &Path, id: &str, owner: &Path) -> GatewayError {
    GatewayError::component(
        path,
        format!("tool id '{id}' already provided by {}", owner.display()),
    )
}
