//! `viaduct` normalizes three different LLM provider wire protocols — the
//! OpenAI-style chat-completions SSE stream, OpenAI's Responses API, and
//! Google's Gemini `streamGenerateContent` endpoint — into one
//! [`event::LLMEvent`] stream behind the [`adapter::LLMAdapter`] trait.
//!
//! Nothing provider-specific escapes the `adapters` module: the rest of the
//! workspace (`viaduct-agent`, `viaduct-cli`) only ever sees [`message`],
//! [`tool`] and [`event`] types.

pub mod adapter;
pub mod adapters;
pub mod error;
pub mod event;
pub mod message;
pub mod model_info;
pub mod tool;
pub mod transport;

pub use adapter::LLMAdapter;
pub use error::LLMError;
pub use event::LLMEvent;
pub use message::{Content, ContentBlock, ImageMime, Message, Role, Usage};
pub use tool::{ToolCall, ToolResultForLLM, ToolSchema};
