//! Filesystem walks that find capability sources under a configured root.

use std::path::{Component, Path, PathBuf};

/// What a scan is looking for; fixes the accepted extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    /// `.md` files, recursively.
    Prompts,
    /// Immediate subdirectories, one per resource.
    Resources,
    /// Declarative in-process tool descriptors (`.yaml`, `.yml`, `.json`).
    ToolModules,
    /// Executable script tools (`.sh`).
    ToolScripts,
}

impl ScanKind {
    fn extensions(&self) -> &'static [&'static str] {
        match self {
            ScanKind::Prompts => &["md"],
            ScanKind::Resources => &[],
            ScanKind::ToolModules => &["yaml", "yml", "json"],
            ScanKind::ToolScripts => &["sh"],
        }
    }
}

#[derive(Debug, Default)]
pub struct Discovered {
    pub paths: Vec<PathBuf>,
    /// The root did not exist; the scan yielded nothing.
    pub missing_root: bool,
}

/// Walk `root` for sources of `kind`. A missing root is a warning, not an
/// error; unreadable subdirectories are skipped. Results are sorted so load
/// order is reproducible across filesystems.
pub async fn scan(root: &Path, kind: ScanKind) -> Discovered {
    if tokio::fs::metadata(root).await.map(|m| !m.is_dir()).unwrap_or(true) {
        tracing::warn!(root = %root.display(), ?kind, "capability directory not found");
        return Discovered { paths: Vec::new(), missing_root: true };
    }
    let mut paths = match kind {
        ScanKind::Resources => subdirectories(root).await,
        _ => files_with_extensions(root, kind.extensions(), &[]).await,
    };
    paths.sort();
    Discovered { paths, missing_root: false }
}

/// Every file under `root` (any depth) whose extension is in `extensions`,
/// or every file when `extensions` is empty. Files named in `exclude` are
/// skipped at any depth.
pub async fn files_with_extensions(root: &Path, extensions: &[&str], exclude: &[&str]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            let name = entry.file_name();
            if exclude.iter().any(|x| name.to_str() == Some(*x)) {
                continue;
            }
            if file_type.is_dir() {
                pending.push(path);
            } else if extensions.is_empty() || has_extension(&path, extensions) {
                found.push(path);
            }
        }
    }
    found
}

async fn subdirectories(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(root).await else {
        return dirs;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            dirs.push(entry.path());
        }
    }
    dirs
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e))
}

/// `root/a/b/name.md` -> `a/b/name`, always `/`-separated.
pub fn capability_id(root: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// `/`-separated path of `file` relative to `root`, extension kept.
pub fn relative_posix(root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(root).unwrap_or(file);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "md" => "text/markdown",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "js" => "application/javascript",
        "ts" => "application/typescript",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "yaml" | "yml" => "application/yaml",
        _ => "application/octet-stream",
    }
}
