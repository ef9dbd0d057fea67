//! `read_skill {name}` — fetches one skill's full markdown body by name.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::skills;
use crate::tool_schema::ToolDefinition;
use crate::tools::context::{Tool, ToolContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
struct ReadSkillArgs {
    /// Name of the skill to read, as returned by list_skills.
    name: String,
}

pub struct ReadSkillTool;

impl Default for ReadSkillTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadSkillTool {
    pub fn new() -> Self {
        ReadSkillTool
    }
}

#[async_trait]
impl Tool for ReadSkillTool {
    fn name(&self) -> &str {
        "read_skill"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new::<ReadSkillArgs>(self.name(), "Read one skill's full body by name.")
    }

    async fn call(&self, args: Value, context: &dyn ToolContext) -> Result<String, ToolError> {
        let args: ReadSkillArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidRequest(e.to_string()))?;
        let dir = context
            .skills_dir()
            .ok_or_else(|| ToolError::InvalidRequest("no skills directory configured".into()))?;

        let found = skills::discover(dir).map_err(ToolError::Other)?;
        found
            .into_iter()
            .find(|s| s.metadata.name == args.name)
            .map(|s| s.content)
            .ok_or_else(|| ToolError::InvalidRequest(format!("no skill named '{}'", args.name)))
    }
}
