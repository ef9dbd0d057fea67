//! Process-wide correlation of out-of-band approval requests/responses.
//!
//! The Orchestrator calls `request()` when the Policy Engine returns
//! `require_approval` and awaits the returned future; whichever `Channel`
//! originated the turn is expected to eventually call `resolve_request` with
//! the user's decision, delivered however that channel receives replies
//! (button click, free-text "yes"/"no", etc).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;
use uuid::Uuid;

/// The outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Allow,
    Deny,
}

/// Identifies who a prompt should be delivered to and why.
#[derive(Debug, Clone)]
pub struct RequesterContext {
    pub user_id: String,
    pub channel_id: String,
}

/// One outstanding approval prompt, as seen by the handler that must deliver it.
#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub id: String,
    pub prompt: String,
    pub context: RequesterContext,
}

/// Installed once by the channel subsystem; delivers a `PermissionRequest`
/// to whatever surface the user will respond on.
#[async_trait]
pub trait PermissionHandler: Send + Sync {
    async fn handle(&self, request: PermissionRequest) -> anyhow::Result<()>;
}

struct Pending {
    #[allow(dead_code)]
    prompt: String,
    #[allow(dead_code)]
    context: RequesterContext,
    resolver: oneshot::Sender<PermissionDecision>,
}

/// A process-wide singleton (construct one, share it via `Arc`) holding the
/// map of in-flight requests plus the single registered handler.
#[derive(Default)]
pub struct PermissionBridge {
    pending: Mutex<HashMap<String, Pending>>,
    handler: Mutex<Option<std::sync::Arc<dyn PermissionHandler>>>,
}

impl PermissionBridge {
    pub fn new() -> Self {
        PermissionBridge {
            pending: Mutex::new(HashMap::new()),
            handler: Mutex::new(None),
        }
    }

    pub fn register_handler(&self, handler: std::sync::Arc<dyn PermissionHandler>) {
        *self.handler.lock().expect("handler mutex poisoned") = Some(handler);
    }

    /// Allocates a fresh id, stores a `Pending` entry, and asynchronously
    /// invokes the handler. With no handler registered, or if invoking it
    /// fails, resolves immediately to `Deny`.
    pub async fn request(&self, prompt: String, context: RequesterContext) -> PermissionDecision {
        let id = Uuid::new_v4().to_string();
        let handler = self.handler.lock().expect("handler mutex poisoned").clone();

        let Some(handler) = handler else {
            log::info!("permission request {} has no registered handler; denying", id);
            return PermissionDecision::Deny;
        };

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending mutex poisoned");
            pending.insert(
                id.clone(),
                Pending {
                    prompt: prompt.clone(),
                    context: context.clone(),
                    resolver: tx,
                },
            );
        }

        let req = PermissionRequest {
            id: id.clone(),
            prompt,
            context,
        };
        if let Err(e) = handler.handle(req).await {
            log::warn!("permission handler failed for request {}: {}", id, e);
            self.pending.lock().expect("pending mutex poisoned").remove(&id);
            return PermissionDecision::Deny;
        }

        rx.await.unwrap_or_else(|_| {
            log::warn!("permission request {} resolver dropped without a decision", id);
            PermissionDecision::Deny
        })
    }

    /// Completes the pending request's resolver and removes it. A second
    /// call with the same `id` (already resolved or never issued) is a
    /// logged no-op, not an error.
    pub fn resolve_request(&self, id: &str, decision: PermissionDecision) {
        let entry = self.pending.lock().expect("pending mutex poisoned").remove(id);
        match entry {
            Some(pending) => {
                let _ = pending.resolver.send(decision);
            }
            None => {
                log::info!("resolve_request: no pending permission request with id {}", id);
            }
        }
    }

    /// Used by channels that accept free-text approvals instead of a button
    /// click tied to a specific request id.
    pub fn find_request_by_user(&self, user_id: &str) -> Option<PermissionRequest> {
        self.pending
            .lock()
            .expect("pending mutex poisoned")
            .iter()
            .find(|(_, pending)| pending.context.user_id == user_id)
            .map(|(id, pending)| PermissionRequest {
                id: id.clone(),
                prompt: pending.prompt.clone(),
                context: pending.context.clone(),
            })
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("pending mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct EchoHandler {
        bridge: Arc<PermissionBridge>,
        decision: PermissionDecision,
    }

    #[async_trait]
    impl PermissionHandler for EchoHandler {
        async fn handle(&self, request: PermissionRequest) -> anyhow::Result<()> {
            self.bridge.resolve_request(&request.id, self.decision);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl PermissionHandler for FailingHandler {
        async fn handle(&self, _request: PermissionRequest) -> anyhow::Result<()> {
            anyhow::bail!("delivery failed")
        }
    }

    fn ctx() -> RequesterContext {
        RequesterContext {
            user_id: "u1".into(),
            channel_id: "c1".into(),
        }
    }

    #[tokio::test]
    async fn no_handler_registered_denies_deterministically() {
        let bridge = PermissionBridge::new();
        let decision = bridge.request("run rm -rf?".into(), ctx()).await;
        assert_eq!(decision, PermissionDecision::Deny);
    }

    #[tokio::test]
    async fn handler_resolving_allow_is_observed_by_the_waiter() {
        let bridge = Arc::new(PermissionBridge::new());
        bridge.register_handler(Arc::new(EchoHandler {
            bridge: bridge.clone(),
            decision: PermissionDecision::Allow,
        }));
        let decision = bridge.request("run ls?".into(), ctx()).await;
        assert_eq!(decision, PermissionDecision::Allow);
    }

    #[tokio::test]
    async fn failing_handler_invocation_denies_and_clears_pending() {
        let bridge = Arc::new(PermissionBridge::new());
        bridge.register_handler(Arc::new(FailingHandler));
        let decision = bridge.request("run rm?".into(), ctx()).await;
        assert_eq!(decision, PermissionDecision::Deny);
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn resolve_request_is_idempotent() {
        let bridge = Arc::new(PermissionBridge::new());
        let (tx, rx) = oneshot::channel::<PermissionDecision>();
        bridge.pending.lock().unwrap().insert(
            "req1".into(),
            Pending {
                prompt: "x".into(),
                context: ctx(),
                resolver: tx,
            },
        );
        bridge.resolve_request("req1", PermissionDecision::Allow);
        bridge.resolve_request("req1", PermissionDecision::Deny); // no-op, logged only
        assert_eq!(rx.await.unwrap(), PermissionDecision::Allow);
    }

    #[tokio::test]
    async fn find_request_by_user_locates_pending_prompt() {
        let bridge = Arc::new(PermissionBridge::new());
        let (tx, _rx) = oneshot::channel::<PermissionDecision>();
        bridge.pending.lock().unwrap().insert(
            "req1".into(),
            Pending {
                prompt: "delete file?".into(),
                context: ctx(),
                resolver: tx,
            },
        );
        let found = bridge.find_request_by_user("u1").unwrap();
        assert_eq!(found.prompt, "delete file?");
        assert!(bridge.find_request_by_user("nobody").is_none());
    }
}
