//! One module per wire protocol. Each exposes a unit struct implementing
//! [`crate::adapter::LLMAdapter`]; all three are built on the same
//! [`crate::transport`] primitives, so they differ only in request shape and
//! event parsing.

pub mod gemini;
pub mod openai;
pub mod responses;

/// Connection details shared by every adapter: where to send the request and
/// which model to ask for. Each variant interprets `base_url` with its own
/// default (see each module's `DEFAULT_BASE_URL`).
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Per-request deadline (`spec.md` §5: "configurable deadline (default
    /// 120s), enforced via a cancellation scope that aborts the reader").
    pub timeout_secs: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            api_key: String::new(),
            base_url: String::new(),
            model: String::new(),
            max_tokens: None,
            temperature: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `spec.md` §5's default LLM request deadline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
