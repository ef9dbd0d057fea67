use crate::event::LLMEvent;
use crate::message::Message;
use crate::tool::{ToolResultForLLM, ToolSchema};
use futures::Stream;
use std::pin::Pin;

/// One operation shared by all three wire-protocol adapters.
///
/// The returned stream is lazy (nothing is sent until it is polled), finite,
/// and not restartable. `tool_results` carries the *previous* round's results
/// so the adapter can produce the provider-idiomatic tool-response
/// representation (role=tool messages, `function_call_output` items, or
/// paired model/user `functionResponse` parts).
pub trait LLMAdapter: Send + Sync {
    fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSchema]>,
        tool_results: Option<&[ToolResultForLLM]>,
        system_prompt: Option<&str>,
        previous_response_id: Option<&str>,
    ) -> Pin<Box<dyn Stream<Item = LLMEvent> + Send>>;

    /// Static, table-driven estimate; consulted but never enforced by the
    /// orchestrator (see SPEC_FULL.md's "Context size" note).
    fn max_context_tokens(&self, model: &str) -> Option<u32>;
}
