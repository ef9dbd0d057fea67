mod cli_args;
mod config;
mod stdio_channel;

use std::sync::Arc;

use clap::Parser;
use viaduct::adapters::{gemini::GeminiAdapter, openai::OpenAIAdapter, responses::ResponsesAdapter, AdapterConfig};
use viaduct::LLMAdapter;
use viaduct_agent::tools::builtins::all_builtin_tools;
use viaduct_agent::{Channel, Gateway, GatewayConfig, PermissionBridge, PolicyEngine, SessionManager, ToolRegistry};

use cli_args::CliArgs;
use config::LlmFormat;
use stdio_channel::StdioChannel;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = config::load(&args)?;

    viaduct_utils::telemetry::setup_telemetry(&config.log_directive);

    let adapter_config = AdapterConfig {
        api_key: config.api_key.clone(),
        base_url: config.base_url.clone(),
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        timeout_secs: config.timeout_secs,
    };
    let adapter: Arc<dyn LLMAdapter> = match config.format {
        LlmFormat::OpenAi => Arc::new(OpenAIAdapter::new(adapter_config)),
        LlmFormat::Responses => Arc::new(ResponsesAdapter::new(adapter_config)),
        LlmFormat::Gemini => Arc::new(GeminiAdapter::new(adapter_config)),
    };

    let mut registry = ToolRegistry::new();
    for tool in all_builtin_tools() {
        registry.add(tool);
    }

    let mut policy_engine = PolicyEngine::new(vec![]);
    if let Some(shell_confirm_list) = config.shell_confirm_list.clone() {
        policy_engine = policy_engine.with_shell_confirm_list(shell_confirm_list);
    }
    let policy = Arc::new(policy_engine);
    let bridge = Arc::new(PermissionBridge::new());
    let sessions = Arc::new(SessionManager::new());
    viaduct_agent::session::spawn_sweeper(sessions.clone());

    let channel = Arc::new(StdioChannel::new(bridge.clone()));
    bridge.register_handler(channel.clone());

    let gateway = Arc::new(Gateway::new(
        adapter,
        Arc::new(registry),
        policy,
        bridge,
        sessions,
        GatewayConfig {
            system_prompt: config.system_prompt.clone(),
            max_iterations: config.max_iterations,
            sessions_root: Some(config.sessions_root.clone()),
            skills_dir: config.skills_dir.clone(),
        },
    ));

    log::info!("viaduct agent gateway starting on stdio");
    channel.start(gateway).await
}
