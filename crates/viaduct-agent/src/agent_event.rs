//! The outgoing event stream the orchestrator produces for one turn.

use serde_json::Value;

/// One event in the lazy, finite sequence `Orchestrator::run` produces.
///
/// The sequence always ends with exactly one of `Done` or `Error` — never
/// `ToolStart` or `ToolPending`.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A fragment of assistant text, forwarded from the underlying `LLMEvent`.
    TextDelta { content: String },
    /// A tool call was selected for execution; policy has not run yet.
    ToolStart {
        id: String,
        name: String,
        args: Value,
    },
    /// Policy requires human approval before this call executes.
    ToolPending {
        id: String,
        name: String,
        args: Value,
        prompt: String,
    },
    /// A tool call reached a terminal outcome (executed, denied, or errored).
    ToolResult {
        id: String,
        name: String,
        result: Value,
    },
    /// The turn finished with a final textual response.
    Done { full_response: String },
    /// The turn ended without a final response.
    Error { message: String },
}
