//! Tool context and error types for the unified tool interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Capability requirements that tools may need. Consulted by the policy
/// engine's read-only/write-like heuristics (see `crate::policy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CapabilityRequirement {
    /// Requires filesystem access (cwd must be set).
    Filesystem,
    /// Spawns a subprocess.
    Process,
}

/// Unified error type for all tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Execution context passed to every tool call. One implementation
/// (`AgentToolContext`) backs both the CLI and tests.
#[async_trait]
pub trait ToolContext: Send + Sync {
    /// The owning session's id, for logging/attribution.
    fn session_id(&self) -> &str;

    /// Current working directory, if set.
    fn cwd(&self) -> Option<&Path>;

    /// Resolves a path against `cwd`. Absolute paths pass through unchanged.
    fn resolve_path(&self, path: &str) -> Result<PathBuf, ToolError> {
        let path = Path::new(path);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            self.cwd().map(|cwd| cwd.join(path)).ok_or_else(|| {
                ToolError::InvalidRequest(
                    "cannot resolve relative path: no working directory set".into(),
                )
            })
        }
    }

    /// Directory skills are loaded from, if any.
    fn skills_dir(&self) -> Option<&Path>;
}

/// Implemented by every tool the registry can dispatch to.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// The tool's wire-facing schema (name, description, input JSON-Schema).
    fn definition(&self) -> crate::tool_schema::ToolDefinition;

    /// Capabilities this tool needs. Default: none.
    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[]
    }

    async fn call(&self, args: serde_json::Value, context: &dyn ToolContext)
    -> Result<String, ToolError>;
}

impl From<viaduct::LLMError> for ToolError {
    fn from(error: viaduct::LLMError) -> Self {
        ToolError::ProviderError(error.to_string())
    }
}
