//! Derives the JSON-Schema the LLM sees from each tool's Rust arguments
//! struct, via `schemars`, rather than hand-writing `serde_json::json!` by
//! hand per tool. `Option<T>` fields are naturally absent from `required` and
//! any nested `Option`/default-valued field stays optional transitively —
//! that projection falls out of `schemars`' own handling of `Option` and
//! `#[serde(default)]`, so there is no bespoke unwrap pass here.

use schemars::JsonSchema;
use serde_json::Value;

/// A tool's full wire-facing definition: name, one-line description, and the
/// JSON-Schema of its arguments.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new<T: JsonSchema>(name: impl Into<String>, description: impl Into<String>) -> Self {
        let schema = schemars::schema_for!(T);
        let mut input_schema = serde_json::to_value(&schema).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut input_schema {
            map.remove("$schema");
            map.remove("title");
        }
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    pub fn into_tool_schema(self) -> viaduct::ToolSchema {
        viaduct::ToolSchema {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema,
        }
    }
}
