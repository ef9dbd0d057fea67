//! `edit_file {path, old_text, new_text}` — an exact-match string
//! replacement. Fails rather than guessing when `old_text` is absent or
//! ambiguous, since a silent wrong-occurrence edit is worse than an error.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tool_schema::ToolDefinition;
use crate::tools::context::{CapabilityRequirement, Tool, ToolContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
struct EditFileArgs {
    /// Path to the file to edit.
    path: String,
    /// Exact text to find. Must appear exactly once in the file.
    old_text: String,
    /// Text to replace it with.
    new_text: String,
}

pub struct EditFileTool;

impl Default for EditFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl EditFileTool {
    pub fn new() -> Self {
        EditFileTool
    }

    /// Replaces the unique occurrence of `old_text` in `content`.
    fn replace(content: &str, old_text: &str, new_text: &str) -> Result<String, ToolError> {
        if old_text.is_empty() {
            return Err(ToolError::InvalidRequest("old_text cannot be empty".into()));
        }
        if old_text == new_text {
            return Err(ToolError::InvalidRequest(
                "old_text and new_text must be different".into(),
            ));
        }

        let Some(idx) = content.find(old_text) else {
            return Err(ToolError::InvalidRequest("old_text not found in file".into()));
        };
        if content[idx + old_text.len()..].find(old_text).is_some() {
            return Err(ToolError::InvalidRequest(
                "old_text found multiple times; provide more surrounding context to make it unique".into(),
            ));
        }

        let mut result = String::with_capacity(content.len());
        result.push_str(&content[..idx]);
        result.push_str(new_text);
        result.push_str(&content[idx + old_text.len()..]);
        Ok(result)
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new::<EditFileArgs>(
            self.name(),
            "Replace an exact, unique span of text in a file. Fails if old_text is missing or appears more than once.",
        )
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem]
    }

    async fn call(&self, args: Value, context: &dyn ToolContext) -> Result<String, ToolError> {
        let args: EditFileArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidRequest(e.to_string()))?;
        let path = context.resolve_path(&args.path)?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::ProviderError(format!("read failed: {}", e)))?;

        let new_content = Self::replace(&content, &args.old_text, &args.new_text)?;

        tokio::fs::write(&path, new_content)
            .await
            .map_err(|e| ToolError::ProviderError(format!("write failed: {}", e)))?;

        Ok(format!("edited {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::AgentToolContext;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn replaces_unique_match() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("f.txt"), "fn foo() {}\n").unwrap();
        let context =
            AgentToolContext::new("test".to_string(), Some(temp_dir.path().to_path_buf()));
        let tool = EditFileTool::new();

        tool.call(
            json!({ "path": "f.txt", "old_text": "foo", "new_text": "bar" }),
            &context,
        )
        .await
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("f.txt")).unwrap(),
            "fn bar() {}\n"
        );
    }

    #[tokio::test]
    async fn rejects_missing_old_text() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("f.txt"), "content").unwrap();
        let context =
            AgentToolContext::new("test".to_string(), Some(temp_dir.path().to_path_buf()));
        let tool = EditFileTool::new();

        let result = tool
            .call(
                json!({ "path": "f.txt", "old_text": "nope", "new_text": "x" }),
                &context,
            )
            .await;
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[tokio::test]
    async fn rejects_ambiguous_old_text() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("f.txt"), "foo foo").unwrap();
        let context =
            AgentToolContext::new("test".to_string(), Some(temp_dir.path().to_path_buf()));
        let tool = EditFileTool::new();

        let result = tool
            .call(
                json!({ "path": "f.txt", "old_text": "foo", "new_text": "bar" }),
                &context,
            )
            .await;
        assert!(result.unwrap_err().to_string().contains("multiple times"));
    }
}
