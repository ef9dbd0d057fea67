use clap::Parser;

/// Command line arguments for the viaduct agent gateway binary.
///
/// Every field is optional here: a `None` means "not set on the command
/// line", letting [`crate::config::load`] fall through to the environment
/// variable, then the config file, then the built-in default, per
/// `spec.md` §6's precedence rule.
#[derive(Parser, Debug, Default)]
#[clap(name = "viaduct", about = "Headless agent gateway: stdio demo channel")]
pub struct CliArgs {
    /// Path to the TOML config file. Defaults to `~/.viaduct/config.toml`.
    #[arg(long, env = "VIADUCT_CONFIG")]
    pub config: Option<String>,

    /// Wire format: "openai" (chat-completions), "claude" (responses API),
    /// or "gemini".
    #[arg(long, env = "VIADUCT_LLM_FORMAT")]
    pub format: Option<String>,

    /// API key for the provider.
    #[arg(long, env = "VIADUCT_LLM_API_KEY")]
    pub api_key: Option<String>,

    /// Base URL for the provider API. Defaults to the adapter's own default.
    #[arg(long, env = "VIADUCT_LLM_BASE_URL")]
    pub base_url: Option<String>,

    /// Model name to request.
    #[arg(long, env = "VIADUCT_LLM_MODEL")]
    pub model: Option<String>,

    /// System prompt prepended to every turn.
    #[arg(long, env = "VIADUCT_LLM_SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// Maximum tool-call iterations per turn before the orchestrator gives
    /// up and surfaces a terminal error.
    #[arg(long, env = "VIADUCT_LLM_MAX_ITERATIONS")]
    pub max_iterations: Option<usize>,

    /// Per-request deadline against the LLM provider, in seconds.
    #[arg(long, env = "VIADUCT_LLM_TIMEOUT")]
    pub timeout_secs: Option<u64>,

    /// `max_tokens`/`max_output_tokens` passed to the provider.
    #[arg(long, env = "VIADUCT_LLM_MAX_TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature passed to the provider.
    #[arg(long, env = "VIADUCT_LLM_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Comma-separated substrings that force `require_approval` for a shell
    /// command, overriding the built-in default list.
    #[arg(long, env = "VIADUCT_LLM_SHELL_CONFIRM_LIST", value_delimiter = ',')]
    pub shell_confirm_list: Option<Vec<String>>,

    /// Log level/filter directive, e.g. "info" or "debug,viaduct_agent=trace".
    #[arg(long, env = "VIADUCT_LOG_LEVEL")]
    pub log_level: Option<String>,
}
