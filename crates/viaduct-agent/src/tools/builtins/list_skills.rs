//! `list_skills {}` — names and descriptions of every discovered skill.
//! Deliberately returns no bodies: reading one is `read_skill`'s job, so the
//! model only pays for the skills it actually ends up using.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::skills;
use crate::tool_schema::ToolDefinition;
use crate::tools::context::{Tool, ToolContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
struct ListSkillsArgs {}

pub struct ListSkillsTool;

impl Default for ListSkillsTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ListSkillsTool {
    pub fn new() -> Self {
        ListSkillsTool
    }
}

#[async_trait]
impl Tool for ListSkillsTool {
    fn name(&self) -> &str {
        "list_skills"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new::<ListSkillsArgs>(
            self.name(),
            "List the names and descriptions of available skills.",
        )
    }

    async fn call(&self, _args: Value, context: &dyn ToolContext) -> Result<String, ToolError> {
        let Some(dir) = context.skills_dir() else {
            return Ok(json!([]).to_string());
        };
        let found = skills::discover(dir).map_err(ToolError::Other)?;
        let listing: Vec<Value> = found
            .iter()
            .map(|s| json!({ "name": s.metadata.name, "description": s.metadata.description }))
            .collect();
        serde_json::to_string(&listing)
            .map_err(|e| ToolError::ProviderError(format!("serialize failed: {}", e)))
    }
}
