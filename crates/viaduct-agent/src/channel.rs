//! The abstract surface the Orchestrator/Gateway talks to: chat platforms
//! (Telegram, Feishu, ...) implement `Channel` as out-of-scope collaborators;
//! this crate only depends on the contract (see `spec.md` §6).

use std::sync::Arc;

use async_trait::async_trait;
use viaduct::Content;

use crate::permission_bridge::PermissionRequest;

/// Delivers one or more reply fragments back to the user on the channel a
/// turn originated from. May be called multiple times; a channel may split
/// an overly long reply across several calls.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, text: &str) -> anyhow::Result<()>;
}

/// Installed on a `Channel` by whoever wires the system together (the
/// Gateway); invoked once per inbound user message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(
        &self,
        input: Content,
        user_id: String,
        channel_id: String,
        reply: Arc<dyn ReplySink>,
    );
}

/// One chat platform surface. Concrete implementations (Telegram, Feishu,
/// the CLI's `StdioChannel`) are collaborators; the Orchestrator only ever
/// sees this trait.
#[async_trait]
pub trait Channel: Send + Sync {
    fn id(&self) -> &str;

    async fn start(&self, handler: Arc<dyn MessageHandler>) -> anyhow::Result<()>;

    async fn stop(&self) -> anyhow::Result<()>;

    /// Delivers an approval prompt to the channel. Channels that don't
    /// support human-in-the-loop approval can leave this at its default,
    /// which silently declines to deliver (the bridge's `request()` then
    /// times out to the caller's own judgement, or denies if invoked
    /// directly as a `PermissionHandler`).
    async fn handle_permission_request(&self, request: PermissionRequest) -> anyhow::Result<()> {
        let _ = request;
        Ok(())
    }
}
