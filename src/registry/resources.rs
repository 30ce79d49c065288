use std::path::Path;

use crate::core::error::GatewayError;
use crate::discovery::{self, ScanKind};
use crate::domain::{ResourceCapability, ResourceFile};

/// Supplies the description; never served as a file.
pub const RESOURCE_README: &str = "README.md";

/// One resource per immediate subdirectory of `root`. A directory that
/// fails to load is skipped whole.
pub async fn load_resources(root: &Path) -> (Vec<ResourceCapability>, Vec<GatewayError>) {
    let mut warnings = Vec::new();
    let found = discovery::scan(root, ScanKind::Resources).await;
    if found.missing_root {
        warnings.push(GatewayError::component(root, "resources directory not found"));
    }
    let mut resources = Vec::with_capacity(found.paths.len());
    for dir in found.paths {
        match load_resource(&dir).await {
            Ok(res) => resources.push(res),
            Err(e) => {
                tracing::warn!(error = %e, "error loading resource directory");
                warnings.push(e);
            }
        }
    }
    (resources, warnings)
}

async fn load_resource(dir: &Path) -> Result<ResourceCapability, GatewayError> {
    let id = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| GatewayError::component(dir, "directory name is not valid UTF-8"))?
        .to_owned();

    let description = match tokio::fs::read_to_string(dir.join(RESOURCE_README)).await {
        Ok(text) => readme_title(&text).unwrap_or_else(|| id.clone()),
        Err(_) => {
            tracing::debug!(resource = %id, "no README.md, using directory name");
            id.clone()
        }
    };

    let mut paths = discovery::files_with_extensions(dir, &[], &[RESOURCE_README]).await;
    paths.sort();
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| GatewayError::component(&path, e))?;
        files.push(ResourceFile {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            relative_path: discovery::relative_posix(dir, &path),
            content_type: discovery::content_type(&path),
            content,
        });
    }

    Ok(ResourceCapability { id, description, files })
}

/// First line with any leading `#` run stripped.
fn readme_title(text: &str) -> Option<String> {
    let first = text.lines().next()?;
    let title = first.trim_start_matches('#').trim();
    (!title.is_empty()).then(|| title.to_owned())
}
