//! Schema-validated dispatch from a tool name + args to a `ToolResult`.
//!
//! The executor is a pure execution unit: it never consults the Policy
//! Engine. Callers (the Orchestrator) decide *whether* to call `execute`;
//! this module only decides *how*.

use serde::Serialize;
use serde_json::Value;

use crate::tools::context::{Tool, ToolContext};
use crate::tools::registry::ToolRegistry;

/// The normalized outcome of running one tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(data: Value) -> Self {
        ToolResult {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Looks up `tool_name` in `registry`, validates `args` against its schema,
/// invokes it, and normalizes the outcome. Never panics: execution failures
/// are caught and folded into `ToolResult::failure`.
pub async fn execute(
    registry: &ToolRegistry,
    tool_name: &str,
    args: Value,
    context: &dyn ToolContext,
) -> ToolResult {
    let Some(tool) = registry.find(tool_name) else {
        return ToolResult::failure("tool not found");
    };

    if let Err(reason) = validate_args(&tool.definition().input_schema, &args) {
        return ToolResult::failure(format!("invalid arguments: {}", reason));
    }

    match tool.call(args, context).await {
        Ok(raw) => {
            let data = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            ToolResult::success(data)
        }
        Err(e) => ToolResult::failure(e.to_string()),
    }
}

/// A minimal structural check against the top-level JSON-Schema `schemars`
/// produces: every name in `required` must be present in `args`, and every
/// present field's JSON type must match its schema's declared `type` (when
/// the schema names exactly one). This is deliberately not a full JSON
/// Schema validator — the registry only ever needs to catch the common
/// "model omitted a required field" / "model sent a string where a number
/// was expected" mistakes before they reach the tool body.
fn validate_args(schema: &Value, args: &Value) -> Result<(), String> {
    let Some(schema_obj) = schema.as_object() else {
        return Ok(());
    };
    let Some(properties) = schema_obj.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    let args_obj = args.as_object().cloned().unwrap_or_default();

    if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
        for name in required {
            let Some(name) = name.as_str() else { continue };
            if !args_obj.contains_key(name) {
                return Err(format!("missing required field '{}'", name));
            }
        }
    }

    for (name, value) in &args_obj {
        let Some(field_schema) = properties.get(name) else {
            continue;
        };
        let Some(expected) = field_schema.get("type").and_then(Value::as_str) else {
            continue;
        };
        if !json_type_matches(expected, value) {
            return Err(format!(
                "field '{}' expected type '{}', got {}",
                name,
                expected,
                json_type_name(value)
            ));
        }
    }

    Ok(())
}

fn json_type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::AgentToolContext;
    use crate::tools::builtins::ShellTool;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_tool_is_reported_without_panicking() {
        let registry = ToolRegistry::new();
        let context = AgentToolContext::new("s1".into(), None);
        let result = execute(&registry, "nope", json!({}), &context).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("tool not found"));
    }

    #[tokio::test]
    async fn invalid_arguments_are_reported_before_dispatch() {
        let mut registry = ToolRegistry::new();
        registry.add(Arc::new(ShellTool::new()));
        let context = AgentToolContext::new("s1".into(), None);
        let result = execute(&registry, "shell", json!({}), &context).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("invalid arguments"));
    }

    #[tokio::test]
    async fn valid_call_normalizes_to_success() {
        let mut registry = ToolRegistry::new();
        registry.add(Arc::new(ShellTool::new()));
        let context = AgentToolContext::new("s1".into(), None);
        let result = execute(&registry, "shell", json!({ "command": "echo hi" }), &context).await;
        assert!(result.success);
        assert!(result.data.is_some());
    }
}
