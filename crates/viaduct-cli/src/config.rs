//! Layered configuration: CLI args > environment variables > config file >
//! defaults, per `spec.md` §6. `cli_args::CliArgs` already folds in the env
//! layer via clap's `env = "..."` attribute, so this module only has to
//! merge the parsed args over the config file and built-in defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::cli_args::CliArgs;

/// Which wire protocol `main` should build an adapter for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmFormat {
    /// Chat-completions (OpenAI-style), also covering Qwen/DeepSeek/Ollama.
    OpenAi,
    /// OpenAI's Responses API. Config value `"claude"` for historical
    /// reasons — see `DESIGN.md`'s Open Question decision on this naming.
    Responses,
    Gemini,
}

impl LlmFormat {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "openai" => Ok(LlmFormat::OpenAi),
            "claude" => Ok(LlmFormat::Responses),
            "gemini" => Ok(LlmFormat::Gemini),
            other => anyhow::bail!("unknown llm.format: {other} (expected openai, claude, or gemini)"),
        }
    }
}

/// The resolved, ready-to-use configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub format: LlmFormat,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub max_iterations: usize,
    pub timeout_secs: u64,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub shell_confirm_list: Option<Vec<String>>,
    pub log_directive: String,
    pub sessions_root: PathBuf,
    pub skills_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    llm: FileLlmConfig,
    #[serde(default)]
    logging: FileLoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileLlmConfig {
    format: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    system_prompt: Option<String>,
    max_iterations: Option<usize>,
    timeout: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    shell_confirm_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileLoggingConfig {
    level: Option<String>,
    verbose: Option<bool>,
}

const DEFAULT_MAX_ITERATIONS: usize = 10;
const DEFAULT_LOG_DIRECTIVE: &str = "info";
const DEFAULT_TIMEOUT_SECS: u64 = viaduct::adapters::DEFAULT_TIMEOUT_SECS;

/// Default location of the config file, following the teacher's
/// `~/.<name>/config.toml` convention, renamed for this project.
fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".viaduct").join("config.toml"))
}

fn default_sessions_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".viaduct")
        .join("sessions")
}

/// Reads the config file (if present at the resolved path) and layers
/// `args` on top of it, falling back to built-in defaults for anything
/// neither specifies.
pub fn load(args: &CliArgs) -> anyhow::Result<Config> {
    let config_path = args.config.as_ref().map(PathBuf::from).or_else(default_config_path);

    let file = match &config_path {
        Some(path) if path.is_file() => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
            toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse {}: {}", path.display(), e))?
        }
        _ => FileConfig::default(),
    };

    let format_str = args
        .format
        .clone()
        .or(file.llm.format)
        .unwrap_or_else(|| "openai".to_string());

    let api_key = args
        .api_key
        .clone()
        .or(file.llm.api_key)
        .ok_or_else(|| anyhow::anyhow!("no llm.api_key set (--api-key, VIADUCT_LLM_API_KEY, or config file)"))?;

    let model = args
        .model
        .clone()
        .or(file.llm.model)
        .ok_or_else(|| anyhow::anyhow!("no llm.model set (--model, VIADUCT_LLM_MODEL, or config file)"))?;

    let log_directive = args
        .log_level
        .clone()
        .or(file.logging.level)
        .unwrap_or_else(|| DEFAULT_LOG_DIRECTIVE.to_string());

    Ok(Config {
        format: LlmFormat::parse(&format_str)?,
        api_key,
        base_url: args.base_url.clone().or(file.llm.base_url).unwrap_or_default(),
        model,
        system_prompt: args.system_prompt.clone().or(file.llm.system_prompt),
        max_iterations: args
            .max_iterations
            .or(file.llm.max_iterations)
            .unwrap_or(DEFAULT_MAX_ITERATIONS),
        timeout_secs: args.timeout_secs.or(file.llm.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS),
        max_tokens: args.max_tokens.or(file.llm.max_tokens),
        temperature: args.temperature.or(file.llm.temperature),
        shell_confirm_list: args.shell_confirm_list.clone().or(file.llm.shell_confirm_list),
        log_directive,
        sessions_root: default_sessions_root(),
        skills_dir: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_args() -> CliArgs {
        CliArgs {
            config: Some("/nonexistent/config.toml".to_string()),
            format: None,
            api_key: Some("sk-test".to_string()),
            base_url: None,
            model: Some("gpt-4o".to_string()),
            system_prompt: None,
            max_iterations: None,
            timeout_secs: None,
            max_tokens: None,
            temperature: None,
            shell_confirm_list: None,
            log_level: None,
        }
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = load(&bare_args()).unwrap();
        assert_eq!(config.format, LlmFormat::OpenAi);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.log_directive, DEFAULT_LOG_DIRECTIVE);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.shell_confirm_list, None);
    }

    #[test]
    fn shell_confirm_list_is_passed_through_from_args() {
        let mut args = bare_args();
        args.shell_confirm_list = Some(vec!["rm".to_string(), "curl".to_string()]);
        let config = load(&args).unwrap();
        assert_eq!(config.shell_confirm_list, Some(vec!["rm".to_string(), "curl".to_string()]));
    }

    #[test]
    fn cli_args_win_over_unset_defaults() {
        let mut args = bare_args();
        args.max_iterations = Some(3);
        let config = load(&args).unwrap();
        assert_eq!(config.max_iterations, 3);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let mut args = bare_args();
        args.api_key = None;
        assert!(load(&args).is_err());
    }

    #[test]
    fn claude_format_maps_to_responses_adapter() {
        let mut args = bare_args();
        args.format = Some("claude".to_string());
        let config = load(&args).unwrap();
        assert_eq!(config.format, LlmFormat::Responses);
    }

    #[test]
    fn unknown_format_is_an_error() {
        let mut args = bare_args();
        args.format = Some("bogus".to_string());
        assert!(load(&args).is_err());
    }
}
