//! The one concrete `Channel` this binary ships: reads lines from stdin,
//! writes replies to stdout, and resolves permission prompts by printing
//! the prompt and reading the next stdin line as an allow/deny answer.
//! Stands in for the out-of-scope Telegram/Feishu adapters (`spec.md` §1).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::Mutex as AsyncMutex;
use viaduct_agent::{
    Channel, MessageHandler, PermissionBridge, PermissionDecision, PermissionHandler, PermissionRequest, ReplySink,
};

/// Fixed identity: a single local user talking to a single local session.
const STDIO_USER_ID: &str = "stdio-user";
const STDIO_CHANNEL_ID: &str = "stdio";

/// Serializes writes to stdout between the main reply path and permission
/// prompts, both of which may be in flight at once.
struct StdoutSink(AsyncMutex<Stdout>);

impl StdoutSink {
    async fn write_line(&self, line: &str) -> anyhow::Result<()> {
        let mut out = self.0.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ReplySink for StdoutSink {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        self.write_line(text).await
    }
}

pub struct StdioChannel {
    bridge: Arc<PermissionBridge>,
    sink: Arc<StdoutSink>,
}

impl StdioChannel {
    pub fn new(bridge: Arc<PermissionBridge>) -> Self {
        StdioChannel {
            bridge,
            sink: Arc::new(StdoutSink(AsyncMutex::new(tokio::io::stdout()))),
        }
    }
}

#[async_trait]
impl Channel for StdioChannel {
    fn id(&self) -> &str {
        STDIO_CHANNEL_ID
    }

    async fn start(&self, handler: Arc<dyn MessageHandler>) -> anyhow::Result<()> {
        let reply_sink: Arc<dyn ReplySink> = self.sink.clone();
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            handler
                .handle_message(
                    line.into(),
                    STDIO_USER_ID.to_string(),
                    STDIO_CHANNEL_ID.to_string(),
                    reply_sink.clone(),
                )
                .await;
        }
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn handle_permission_request(&self, request: PermissionRequest) -> anyhow::Result<()> {
        PermissionHandler::handle(self, request).await
    }
}

/// Registered with the `PermissionBridge` directly, so a request routed
/// through the bridge (rather than through `Channel::handle_permission_request`)
/// prompts on stdout the same way.
#[async_trait]
impl PermissionHandler for StdioChannel {
    async fn handle(&self, request: PermissionRequest) -> anyhow::Result<()> {
        self.sink.write_line(&format!("{} [y/n]", request.prompt)).await?;
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        let decision = match lines.next_line().await? {
            Some(answer) if answer.trim().eq_ignore_ascii_case("y") => PermissionDecision::Allow,
            _ => PermissionDecision::Deny,
        };
        self.bridge.resolve_request(&request.id, decision);
        Ok(())
    }
}
