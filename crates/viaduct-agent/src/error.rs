//! Structured error type for the agent crate.
//!
//! Every variant maps to one of the recoverable/terminal categories the
//! orchestrator distinguishes: recoverable errors become a tool-result or a
//! skipped frame, terminal errors end the turn with an `AgentEvent::Error`.

use thiserror::Error;

use crate::tools::context::ToolError;

/// Top-level error type for the orchestrator and its collaborators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Network failure, non-2xx from the LLM, timeout, or truncated stream.
    /// Terminal: the turn is aborted and history reverted to pre-turn state.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed tool-call arguments from the LLM. Recoverable: fed back to
    /// the LLM as a tool-result error rather than aborting the turn.
    #[error("failed to parse tool arguments: {0}")]
    Parse(String),

    /// Tool argument schema mismatch, caught before dispatch.
    #[error("tool arguments failed validation: {0}")]
    Validation(String),

    /// The policy engine denied a tool call outright.
    #[error("denied by policy: {0}")]
    PolicyDenied(String),

    /// The permission bridge returned a non-approval, or the approval
    /// request was cancelled/timed out with no handler registered.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A tool executed and returned failure. Captured into a tool-result
    /// `{success: false, error}` rather than aborting the turn.
    #[error("tool execution failed: {0}")]
    ToolExecution(#[from] ToolError),

    /// The orchestrator hit `maxIterations` without a final answer. Always
    /// terminal: never surfaced as a partial `done`.
    #[error("exhausted {0} iterations without a final response")]
    IterationExhausted(usize),

    /// Session not found, or the `(userId, chatId)` session lookup failed.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Llm(#[from] viaduct::LLMError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentError {
    /// Whether this error should end the turn, as opposed to being folded
    /// back into the conversation as a recoverable tool-result error.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentError::Transport(_)
                | AgentError::IterationExhausted(_)
                | AgentError::SessionNotFound(_)
                | AgentError::Llm(_)
                | AgentError::Other(_)
        )
    }
}
