//! `shell {command, timeout?}` — runs a command through the platform shell
//! and returns its exit code, stdout, and stderr.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::process::Command;

use crate::tool_schema::ToolDefinition;
use crate::tools::context::{CapabilityRequirement, Tool, ToolContext, ToolError};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// `spec.md` §4.2's "max shell output buffer is 10 MiB" cap, applied to
/// stdout and stderr independently so one noisy stream can't starve the
/// other out of the result.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

fn cap_output(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    if bytes.len() <= MAX_OUTPUT_BYTES {
        String::from_utf8_lossy(bytes)
    } else {
        let mut truncated = String::from_utf8_lossy(&bytes[..MAX_OUTPUT_BYTES]).into_owned();
        truncated.push_str("\n...[truncated]");
        std::borrow::Cow::Owned(truncated)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ShellArgs {
    /// Command to run through the shell (`sh -lc` on Unix, `cmd /C` on Windows).
    command: String,
    /// Maximum seconds to let the command run before it is killed. Defaults to 120.
    timeout: Option<u64>,
}

pub struct ShellTool;

impl Default for ShellTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellTool {
    pub fn new() -> Self {
        ShellTool
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new::<ShellArgs>(self.name(), "Run a shell command and return its exit code, stdout, and stderr.")
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem, CapabilityRequirement::Process]
    }

    async fn call(&self, args: Value, context: &dyn ToolContext) -> Result<String, ToolError> {
        let args: ShellArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidRequest(e.to_string()))?;
        let timeout = Duration::from_secs(args.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let mut cmd = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", &args.command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-lc", &args.command]);
            cmd
        };

        if let Some(cwd) = context.cwd() {
            cmd.current_dir(cwd);
        }
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| ToolError::ProviderError(format!("command failed to spawn: {}", e)))?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => {
                result.map_err(|e| ToolError::ProviderError(format!("command failed: {}", e)))?
            }
            Err(_) => {
                return Err(ToolError::ProviderError(format!(
                    "command timed out after {}s",
                    timeout.as_secs()
                )));
            }
        };

        let result = json!({
            "exit_code": output.status.code().unwrap_or(-1),
            "stdout": cap_output(&output.stdout),
            "stderr": cap_output(&output.stderr),
        });

        serde_json::to_string(&result)
            .map_err(|e| ToolError::ProviderError(format!("serialize failed: {}", e)))
    }
}
