//! Out-of-process tools: an executable reached through a flag protocol.
//!
//! `<script> --mcp-metadata` prints `{description, parameters}` as JSON.
//! `<script> --mcp-execute '<json args>'` prints the result, JSON or plain
//! text, and exits non-zero on failure.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::core::error::GatewayError;
use crate::infra::runtime::limits::{retry_async, ExecLimits};
use crate::schema::{normalize, CanonicalParameter, SchemaSource};

pub const METADATA_FLAG: &str = "--mcp-metadata";
pub const EXECUTE_FLAG: &str = "--mcp-execute";

// ETXTBSY: a freshly written script can still be open in a forked child.
const TEXT_FILE_BUSY: i32 = 26;

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptMetadata {
    pub description: String,
    pub parameters: Vec<CanonicalParameter>,
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: JsonValue,
}

#[derive(Debug, Error)]
enum RunError {
    #[error("failed to launch: {0}")]
    Launch(#[from] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

#[derive(Debug, Clone)]
pub struct ScriptTool {
    id: String,
    path: PathBuf,
    limits: ExecLimits,
}

impl ScriptTool {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, limits: ExecLimits) -> Self {
        Self { id: id.into(), path: path.into(), limits }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Grant `0o755` unless every execute bit is already set.
    #[cfg(unix)]
    pub async fn ensure_executable(&self) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(&self.path).await?.permissions();
        if perms.mode() & 0o111 != 0o111 {
            perms.set_mode(0o755);
            tokio::fs::set_permissions(&self.path, perms).await?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    pub async fn ensure_executable(&self) -> std::io::Result<()> {
        Ok(())
    }

    /// Ask the script for its description and parameters. Never fails: any
    /// problem yields a zero-parameter tool described by `relative_path`.
    pub async fn negotiate(&self, relative_path: &str) -> ScriptMetadata {
        let fallback = format!("Tool from {relative_path}");
        let stdout = match self.run(&[METADATA_FLAG], &CancellationToken::new()).await {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(script = %self.path.display(), error = %e, "metadata negotiation failed, using defaults");
                return ScriptMetadata { description: fallback, parameters: Vec::new() };
            }
        };
        let raw: RawMetadata = match serde_json::from_str(&stdout) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(script = %self.path.display(), error = %e, "metadata is not JSON, using defaults");
                return ScriptMetadata { description: fallback, parameters: Vec::new() };
            }
        };
        ScriptMetadata {
            description: raw
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(fallback),
            parameters: normalize(SchemaSource::InlineMap(&raw.parameters)),
        }
    }

    /// Run with the serialized arguments. JSON output is parsed, anything
    /// else comes back as a string.
    pub async fn execute(
        &self,
        args: &JsonValue,
        cancel: &CancellationToken,
    ) -> Result<JsonValue, GatewayError> {
        let payload = match args {
            JsonValue::Null => "{}".to_owned(),
            other => other.to_string(),
        };
        tracing::debug!(tool = %self.id, "executing script");
        let stdout = self
            .run(&[EXECUTE_FLAG, payload.as_str()], cancel)
            .await
            .map_err(|e| GatewayError::execution(&self.id, format!("Script execution failed: {e}")))?;
        Ok(parse_output(&stdout))
    }

    async fn run(&self, args: &[&str], cancel: &CancellationToken) -> Result<String, RunError> {
        let child = self.spawn(args).await?;
        let output = tokio::select! {
            res = tokio::time::timeout(self.limits.timeout, child.wait_with_output()) => match res {
                Ok(out) => out?,
                Err(_) => return Err(RunError::Timeout(self.limits.timeout)),
            },
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
        };
        if !output.status.success() {
            return Err(RunError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn spawn(&self, args: &[&str]) -> std::io::Result<Child> {
        // only a busy executable is worth retrying; other errors pass through as Ok(Err)
        let path = self.path.as_path();
        let attempt = retry_async(3, move |_| async move {
            let res = Command::new(path)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn();
            match res {
                Err(e) if e.raw_os_error() == Some(TEXT_FILE_BUSY) => Err(e),
                other => Ok(other),
            }
        })
        .await;
        attempt.and_then(|res| res)
    }
}

fn parse_output(stdout: &str) -> JsonValue {
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|_| JsonValue::String(stdout.trim_end().to_owned()))
}
