use std::path::PathBuf;

use thiserror::Error;

/// Gateway-wide error model. Load-time variants below the top-level document
/// are collected as warnings; invoke-time variants reach the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("invalid configuration document {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("failed to load {}: {reason}", path.display())]
    ComponentLoad { path: PathBuf, reason: String },

    #[error("parameter '{parameter}' degraded to any: {reason}")]
    SchemaConversion { parameter: String, reason: String },

    #[error(transparent)]
    UnknownCapability(#[from] UnknownCapability),

    #[error("invalid arguments for '{id}': {}", problems.join("; "))]
    InvalidArguments { id: String, problems: Vec<String> },

    #[error("execution of '{id}' failed: {message}")]
    Execution { id: String, message: String },
}

/// The id or path of an invoke/get/read request did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownCapability {
    #[error("unknown prompt: {0}")]
    Prompt(String),
    #[error("unknown tool: {0}")]
    Tool(String),
    #[error("unknown resource: {0}")]
    Resource(String),
    #[error("file '{path}' not found in resource '{resource}'")]
    ResourceFile { resource: String, path: String },
    #[error("malformed resource uri: {0}")]
    MalformedUri(String),
}

impl GatewayError {
    pub fn component(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        GatewayError::ComponentLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn execution(id: impl Into<String>, message: impl ToString) -> Self {
        GatewayError::Execution {
            id: id.into(),
            message: message.to_string(),
        }
    }
}
