//! Wires the Orchestrator to a `Channel`: the concrete `MessageHandler` a
//! channel's `start()` is handed, and the glue that turns a
//! `require_approval` decision into a `PermissionBridge::request()` round
//! trip addressed back at the originating channel.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use viaduct::{Content, LLMAdapter};

use crate::agent_event::AgentEvent;
use crate::channel::{MessageHandler, ReplySink};
use crate::orchestrator::{self, PermissionCallback};
use crate::permission_bridge::{PermissionBridge, PermissionDecision, RequesterContext};
use crate::policy::PolicyEngine;
use crate::session::SessionManager;
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistry;
use crate::tools::AgentToolContext;

/// Static configuration for a `Gateway`, corresponding to `spec.md` §6's
/// `llm` config block fields the Orchestrator itself consults.
pub struct GatewayConfig {
    pub system_prompt: Option<String>,
    pub max_iterations: usize,
    /// Root directory each session's tool working directory is nested
    /// under, matching §6's `~/.openvia/sessions/` convention.
    pub sessions_root: Option<PathBuf>,
    pub skills_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            system_prompt: None,
            max_iterations: orchestrator::DEFAULT_MAX_ITERATIONS,
            sessions_root: None,
            skills_dir: None,
        }
    }
}

/// The Agent Orchestrator (Gateway) component (C7): owns references to the
/// other five components and drives one turn per inbound message.
pub struct Gateway {
    pub adapter: Arc<dyn LLMAdapter>,
    pub registry: Arc<ToolRegistry>,
    pub policy: Arc<PolicyEngine>,
    pub bridge: Arc<PermissionBridge>,
    pub sessions: Arc<SessionManager>,
    pub config: GatewayConfig,
}

impl Gateway {
    pub fn new(
        adapter: Arc<dyn LLMAdapter>,
        registry: Arc<ToolRegistry>,
        policy: Arc<PolicyEngine>,
        bridge: Arc<PermissionBridge>,
        sessions: Arc<SessionManager>,
        config: GatewayConfig,
    ) -> Self {
        Gateway {
            adapter,
            registry,
            policy,
            bridge,
            sessions,
            config,
        }
    }

    fn tool_context_for(&self, user_id: &str, chat_id: &str) -> Arc<dyn ToolContext> {
        let cwd = self
            .config
            .sessions_root
            .as_ref()
            .map(|root| root.join(user_id).join(chat_id));
        let mut ctx = AgentToolContext::new(format!("{}:{}", user_id, chat_id), cwd);
        if let Some(dir) = &self.config.skills_dir {
            ctx = ctx.with_skills_dir(dir.clone());
        }
        Arc::new(ctx)
    }

    /// Builds the closure the Orchestrator calls when policy requires
    /// approval: a structured parameter rather than ambient/process-local
    /// storage, per `spec.md` §9's note on avoiding the `sendMessage`
    /// re-entrancy footgun.
    fn permission_callback(&self, user_id: String, channel_id: String) -> PermissionCallback {
        let bridge = self.bridge.clone();
        Arc::new(move |prompt: String| {
            let bridge = bridge.clone();
            let context = RequesterContext {
                user_id: user_id.clone(),
                channel_id: channel_id.clone(),
            };
            Box::pin(async move { bridge.request(prompt, context).await == PermissionDecision::Allow })
        })
    }
}

#[async_trait]
impl MessageHandler for Gateway {
    async fn handle_message(
        &self,
        input: Content,
        user_id: String,
        channel_id: String,
        reply: Arc<dyn ReplySink>,
    ) {
        let session = self.sessions.get_or_create(&user_id, &channel_id);
        let tool_context = self.tool_context_for(&user_id, &channel_id);
        let on_permission_request = self.permission_callback(user_id, channel_id);

        let mut events = orchestrator::run_turn(
            self.adapter.clone(),
            self.registry.clone(),
            self.policy.clone(),
            tool_context,
            session,
            input,
            self.config.system_prompt.clone(),
            self.config.max_iterations,
            Some(on_permission_request),
        );

        let mut text = String::new();
        while let Some(event) = events.next().await {
            match event {
                AgentEvent::TextDelta { content } => text.push_str(&content),
                AgentEvent::Done { .. } => {
                    if !text.is_empty() {
                        if let Err(e) = reply.send(&text).await {
                            log::warn!("failed to deliver reply: {}", e);
                        }
                    }
                }
                AgentEvent::Error { message } => {
                    if let Err(e) = reply.send(&format!("error: {}", message)).await {
                        log::warn!("failed to deliver error reply: {}", e);
                    }
                }
                AgentEvent::ToolStart { .. }
                | AgentEvent::ToolPending { .. }
                | AgentEvent::ToolResult { .. } => {
                    // Tool lifecycle events are surfaced to UIs that render
                    // them directly; the accumulated-text reply path only
                    // needs the final textual outcome.
                }
            }
        }
    }
}
