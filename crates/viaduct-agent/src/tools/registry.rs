//! Tool registry: maps tool names to their implementations and projects
//! their schemas for the LLM adapter layer.

use crate::tools::context::Tool;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    pub fn add(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    /// Registers every tool in `tools`, in order. Re-registering a name the
    /// registry already holds replaces it (`spec.md` §8 invariant 1: `get`
    /// always returns the *last* registration with a given name).
    pub fn add_all(&mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> &mut Self {
        for tool in tools {
            self.add(tool);
        }
        self
    }

    pub fn schemas(&self) -> Vec<viaduct::ToolSchema> {
        self.tools
            .values()
            .map(|tool| tool.definition().into_tool_schema())
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtins::ShellTool;

    #[test]
    fn registered_tool_is_findable_and_listed() {
        let mut registry = ToolRegistry::new();
        registry.add(Arc::new(ShellTool::new()));
        assert!(registry.find("shell").is_some());
        assert_eq!(registry.names(), vec!["shell".to_string()]);
        assert_eq!(registry.schemas().len(), 1);
    }

    #[test]
    fn unregistered_tool_is_not_found() {
        let registry = ToolRegistry::new();
        assert!(registry.find("nope").is_none());
    }

    #[test]
    fn re_registering_a_name_replaces_the_last_definition() {
        struct Dummy(&'static str, &'static str);

        #[async_trait::async_trait]
        impl crate::tools::context::Tool for Dummy {
            fn name(&self) -> &str {
                "dummy"
            }
            fn definition(&self) -> crate::tool_schema::ToolDefinition {
                crate::tool_schema::ToolDefinition {
                    name: "dummy".into(),
                    description: self.1.into(),
                    input_schema: serde_json::json!({}),
                }
            }
            async fn call(
                &self,
                _args: serde_json::Value,
                _context: &dyn crate::tools::context::ToolContext,
            ) -> Result<String, crate::tools::context::ToolError> {
                Ok(self.0.into())
            }
        }

        let mut registry = ToolRegistry::new();
        registry.add_all([
            Arc::new(Dummy("v1", "first")) as Arc<dyn Tool>,
            Arc::new(Dummy("v2", "second")) as Arc<dyn Tool>,
        ]);
        assert_eq!(registry.names(), vec!["dummy".to_string()]);
        assert_eq!(registry.find("dummy").unwrap().definition().description, "second");
    }
}
