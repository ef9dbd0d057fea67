//! The unified event stream every adapter produces, regardless of wire format.

use crate::message::Usage;
use serde_json::Value;

/// One event in the lazy, non-restartable sequence a `chat()` call produces.
///
/// The sequence is always finite: it ends with exactly one of `Done` or
/// `Error`.
#[derive(Debug, Clone)]
pub enum LLMEvent {
    /// A fragment of assistant text.
    TextDelta { content: String },
    /// A complete tool call (name + parsed args available).
    ToolCall {
        id: String,
        name: String,
        args: Value,
        meta: Option<Value>,
    },
    /// Progress on a tool call still being assembled (optional; not every
    /// adapter emits these).
    ToolCallDelta {
        id: String,
        name: Option<String>,
        args_fragment: String,
    },
    /// The round finished with no (more) tool calls pending.
    Done {
        usage: Option<Usage>,
        response_id: Option<String>,
    },
    /// Terminal failure; no further events follow.
    Error { message: String },
}
