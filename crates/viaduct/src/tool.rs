//! Wire-facing tool schema and tool-call/result types shared by all adapters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON-Schema projection of a tool's input schema, as exposed to the LLM.
///
/// This is what `ToolRegistry::schemas()` (in `viaduct-agent`) produces and what
/// every adapter's `chat()` receives as the `tools` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A tool call emitted by the LLM mid-stream.
///
/// `meta` carries opaque provider hints that must be echoed back verbatim on
/// the next round (e.g. Gemini's `thoughtSignature`). It is never interpreted
/// by the orchestrator, only threaded through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// The result of executing a tool call, ready to be spliced into the next
/// `chat()` invocation's `tool_results` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultForLLM {
    pub tool_call_id: String,
    pub tool_name: String,
    pub tool_args: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_meta: Option<Value>,
    /// The JSON-serialized `ToolResult` the executor produced.
    pub content: String,
    pub is_error: bool,
}
