//! `write_file {path, content}` — overwrites (or creates) a file, creating
//! parent directories as needed.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::tool_schema::ToolDefinition;
use crate::tools::context::{CapabilityRequirement, Tool, ToolContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
struct WriteFileArgs {
    /// File path to write, relative to the working directory or absolute.
    path: String,
    /// Content to write, replacing the file's existing contents if any.
    content: String,
}

pub struct WriteFileTool;

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteFileTool {
    pub fn new() -> Self {
        WriteFileTool
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new::<WriteFileArgs>(
            self.name(),
            "Write content to a file, creating parent directories if needed.",
        )
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem]
    }

    async fn call(&self, args: Value, context: &dyn ToolContext) -> Result<String, ToolError> {
        let args: WriteFileArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidRequest(e.to_string()))?;
        let path = context.resolve_path(&args.path)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::ProviderError(format!("mkdir failed: {}", e)))?;
        }

        tokio::fs::write(&path, &args.content)
            .await
            .map_err(|e| ToolError::ProviderError(format!("write failed: {}", e)))?;

        let result = json!({ "path": path.display().to_string(), "bytes": args.content.len() });
        serde_json::to_string(&result)
            .map_err(|e| ToolError::ProviderError(format!("serialize failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::AgentToolContext;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let context =
            AgentToolContext::new("test".to_string(), Some(temp_dir.path().to_path_buf()));
        let tool = WriteFileTool::new();

        let result = tool
            .call(json!({ "path": "out.txt", "content": "hi" }), &context)
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["bytes"], 2);
        assert_eq!(std::fs::read_to_string(temp_dir.path().join("out.txt")).unwrap(), "hi");
    }

    #[tokio::test]
    async fn creates_missing_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let context =
            AgentToolContext::new("test".to_string(), Some(temp_dir.path().to_path_buf()));
        let tool = WriteFileTool::new();

        tool.call(json!({ "path": "nested/dir/out.txt", "content": "hi" }), &context)
            .await
            .unwrap();
        assert!(temp_dir.path().join("nested/dir/out.txt").exists());
    }
}
