//! `read_file {path}` — returns a file's full contents. Files over the size
//! cap are rejected rather than silently truncated, so the model never
//! mistakes a partial read for the whole file.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tool_schema::ToolDefinition;
use crate::tools::context::{CapabilityRequirement, Tool, ToolContext, ToolError};

const MAX_READ_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Deserialize, JsonSchema)]
struct ReadFileArgs {
    /// Path to the file to read, relative to the working directory or absolute.
    path: String,
}

pub struct ReadFileTool;

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadFileTool {
    pub fn new() -> Self {
        ReadFileTool
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new::<ReadFileArgs>(self.name(), "Read the full contents of a file.")
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem]
    }

    async fn call(&self, args: Value, context: &dyn ToolContext) -> Result<String, ToolError> {
        let args: ReadFileArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidRequest(e.to_string()))?;
        let path = context.resolve_path(&args.path)?;

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ToolError::ProviderError(format!("cannot stat {}: {}", path.display(), e)))?;
        if meta.len() > MAX_READ_BYTES {
            return Err(ToolError::InvalidRequest(format!(
                "{} is {} bytes, which exceeds the {}-byte read limit",
                path.display(),
                meta.len(),
                MAX_READ_BYTES
            )));
        }

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::ProviderError(format!("read failed: {}", e)))
    }
}
