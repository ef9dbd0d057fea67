//! The iterative tool-calling loop: call the LLM, collect tool calls,
//! evaluate each against policy, optionally await approval, execute, splice
//! results back, repeat until the LLM stops calling tools or the iteration
//! cap is hit. Implements `spec.md` §4.6's algorithm verbatim.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use viaduct::{Content, LLMAdapter, LLMEvent, Message, ToolResultForLLM};

use crate::agent_event::AgentEvent;
use crate::executor;
use crate::policy::PolicyEngine;
use crate::policy::PolicyDecision;
use crate::session::SessionHandle;
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistry;

/// Liveness bound on §4.6's per-turn loop: exceeding it ends the turn with a
/// terminal `AgentEvent::Error` naming the cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Invoked when the Policy Engine returns `require_approval`. Returns
/// `true` to proceed with execution, `false` to deny. `None` means no
/// handler is wired up for this turn, which the algorithm treats as denial.
pub type PermissionCallback =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

/// Runs one turn against `session`, holding its mutex for the whole turn
/// (the concrete mechanism behind §5's "turns from the same user are
/// serialized at the session boundary").
///
/// The returned stream is lazy, finite, and always ends with exactly one of
/// `AgentEvent::Done` or `AgentEvent::Error` — never `ToolStart` or
/// `ToolPending` (§8, invariant 10).
#[allow(clippy::too_many_arguments)]
pub fn run_turn(
    adapter: Arc<dyn LLMAdapter>,
    registry: Arc<ToolRegistry>,
    policy: Arc<PolicyEngine>,
    tool_context: Arc<dyn ToolContext>,
    session: Arc<SessionHandle>,
    message: Content,
    system_prompt: Option<String>,
    max_iterations: usize,
    on_permission_request: Option<PermissionCallback>,
) -> Pin<Box<dyn Stream<Item = AgentEvent> + Send>> {
    let stream = async_stream::stream! {
        let mut session_guard = session.lock().await;
        session_guard.add_message(Message::user(message));
        let messages = session_guard.history.clone();
        let policy_session = session_guard.policy_session();

        let tool_schemas = registry.schemas();
        let tools_arg = if tool_schemas.is_empty() { None } else { Some(tool_schemas.as_slice()) };

        let mut last_tool_results: Vec<ToolResultForLLM> = Vec::new();
        let mut previous_response_id: Option<String> = None;
        let mut accumulated_text = String::new();

        for _iter in 1..=max_iterations {
            let tool_results_arg = if last_tool_results.is_empty() {
                None
            } else {
                Some(last_tool_results.as_slice())
            };

            let mut events = adapter.chat(
                &messages,
                tools_arg,
                tool_results_arg,
                system_prompt.as_deref(),
                previous_response_id.as_deref(),
            );

            let mut pending_tool_calls: Vec<viaduct::ToolCall> = Vec::new();
            let mut round_finished_with_no_calls = false;
            let mut terminal_error: Option<String> = None;

            while let Some(event) = events.next().await {
                match event {
                    LLMEvent::TextDelta { content } => {
                        accumulated_text.push_str(&content);
                        yield AgentEvent::TextDelta { content };
                    }
                    LLMEvent::ToolCall { id, name, args, meta } => {
                        if !name.is_empty() {
                            pending_tool_calls.push(viaduct::ToolCall { id, name, args, meta });
                        }
                    }
                    LLMEvent::ToolCallDelta { .. } => {
                        // Progress-only; nothing in the unified AgentEvent
                        // contract surfaces partial tool-call assembly.
                    }
                    LLMEvent::Done { usage: _, response_id } => {
                        previous_response_id = response_id;
                        if pending_tool_calls.is_empty() {
                            round_finished_with_no_calls = true;
                        }
                        break;
                    }
                    LLMEvent::Error { message } => {
                        terminal_error = Some(message);
                        break;
                    }
                }
            }

            if let Some(message) = terminal_error {
                // TransportError/ParseError: turn aborted, history reverted
                // to pre-turn state except the user message (already added).
                yield AgentEvent::Error { message };
                return;
            }

            if round_finished_with_no_calls {
                session_guard.add_message(Message::assistant(accumulated_text.clone()));
                yield AgentEvent::Done { full_response: accumulated_text };
                return;
            }

            let mut results_this_round = Vec::with_capacity(pending_tool_calls.len());
            for tc in pending_tool_calls {
                yield AgentEvent::ToolStart {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    args: tc.args.clone(),
                };

                let tool = registry.find(&tc.name);
                let result = match tool {
                    None => executor::ToolResult::failure("tool not found"),
                    Some(_) => {
                        let decision = policy.evaluate(&tc.name, &tc.args, &policy_session);
                        match decision {
                            PolicyDecision::Allow => {
                                executor::execute(&registry, &tc.name, tc.args.clone(), tool_context.as_ref()).await
                            }
                            PolicyDecision::Deny { reason } => executor::ToolResult::failure(reason),
                            PolicyDecision::RequireApproval { prompt } => {
                                yield AgentEvent::ToolPending {
                                    id: tc.id.clone(),
                                    name: tc.name.clone(),
                                    args: tc.args.clone(),
                                    prompt: prompt.clone(),
                                };
                                let approved = match &on_permission_request {
                                    Some(cb) => cb(prompt).await,
                                    None => false,
                                };
                                if approved {
                                    executor::execute(&registry, &tc.name, tc.args.clone(), tool_context.as_ref()).await
                                } else {
                                    executor::ToolResult::failure("User denied permission")
                                }
                            }
                        }
                    }
                };

                let result_value = serde_json::to_value(&result).unwrap_or(serde_json::Value::Null);
                yield AgentEvent::ToolResult {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    result: result_value,
                };

                let content = serde_json::to_string(&result).unwrap_or_default();
                results_this_round.push(ToolResultForLLM {
                    tool_call_id: tc.id,
                    tool_name: tc.name,
                    tool_args: tc.args,
                    tool_call_meta: tc.meta,
                    content,
                    is_error: !result.success,
                });
            }
            last_tool_results = results_this_round;
        }

        yield AgentEvent::Error {
            message: format!("Max iterations ({}) reached", max_iterations),
        };
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyEngine;
    use crate::session::SessionManager;
    use crate::tools::builtins::ShellTool;
    use crate::tools::AgentToolContext;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use viaduct::{ToolResultForLLM, ToolSchema};

    /// A scripted adapter: each `chat()` call pops the next round's fixed
    /// sequence of events off the front of a shared queue.
    struct ScriptedAdapter {
        rounds: StdMutex<Vec<Vec<LLMEvent>>>,
    }

    impl ScriptedAdapter {
        fn new(rounds: Vec<Vec<LLMEvent>>) -> Self {
            ScriptedAdapter {
                rounds: StdMutex::new(rounds),
            }
        }
    }

    impl LLMAdapter for ScriptedAdapter {
        fn chat(
            &self,
            _messages: &[Message],
            _tools: Option<&[ToolSchema]>,
            _tool_results: Option<&[ToolResultForLLM]>,
            _system_prompt: Option<&str>,
            _previous_response_id: Option<&str>,
        ) -> Pin<Box<dyn Stream<Item = LLMEvent> + Send>> {
            let mut rounds = self.rounds.lock().unwrap();
            let events = if rounds.is_empty() { Vec::new() } else { rounds.remove(0) };
            Box::pin(futures::stream::iter(events))
        }

        fn max_context_tokens(&self, _model: &str) -> Option<u32> {
            None
        }
    }

    /// Infinite variant for the iteration-cap test: always re-emits the same
    /// tool-call round.
    struct LoopingAdapter;

    impl LLMAdapter for LoopingAdapter {
        fn chat(
            &self,
            _messages: &[Message],
            _tools: Option<&[ToolSchema]>,
            _tool_results: Option<&[ToolResultForLLM]>,
            _system_prompt: Option<&str>,
            _previous_response_id: Option<&str>,
        ) -> Pin<Box<dyn Stream<Item = LLMEvent> + Send>> {
            Box::pin(futures::stream::iter(vec![
                LLMEvent::ToolCall {
                    id: "c1".into(),
                    name: "noop".into(),
                    args: json!({}),
                    meta: None,
                },
                LLMEvent::Done { usage: None, response_id: None },
            ]))
        }

        fn max_context_tokens(&self, _model: &str) -> Option<u32> {
            None
        }
    }

    struct NoopTool;

    #[async_trait::async_trait]
    impl crate::tools::context::Tool for NoopTool {
        fn name(&self) -> &str {
            "noop"
        }
        fn definition(&self) -> crate::tool_schema::ToolDefinition {
            crate::tool_schema::ToolDefinition {
                name: "noop".into(),
                description: "does nothing".into(),
                input_schema: json!({"type": "object", "properties": {}}),
            }
        }
        async fn call(
            &self,
            _args: serde_json::Value,
            _context: &dyn ToolContext,
        ) -> Result<String, crate::tools::context::ToolError> {
            Ok("{}".into())
        }
    }

    async fn collect(stream: Pin<Box<dyn Stream<Item = AgentEvent> + Send>>) -> Vec<AgentEvent> {
        stream.collect().await
    }

    #[tokio::test]
    async fn s1_pure_reply() {
        let adapter: Arc<dyn LLMAdapter> = Arc::new(ScriptedAdapter::new(vec![vec![
            LLMEvent::TextDelta { content: "hello".into() },
            LLMEvent::Done { usage: None, response_id: None },
        ]]));
        let registry = Arc::new(ToolRegistry::new());
        let policy = Arc::new(PolicyEngine::new(vec![]));
        let context: Arc<dyn ToolContext> = Arc::new(AgentToolContext::new("s1".into(), None));
        let sessions = SessionManager::new();
        let session = sessions.get_or_create("u1", "c1");

        let events = collect(run_turn(
            adapter,
            registry,
            policy,
            context,
            session.clone(),
            Content::Text("hi".into()),
            None,
            DEFAULT_MAX_ITERATIONS,
            None,
        ))
        .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], AgentEvent::TextDelta { content } if content == "hello"));
        assert!(matches!(&events[1], AgentEvent::Done { full_response } if full_response == "hello"));

        let locked = session.lock().await;
        assert_eq!(locked.history.len(), 2);
    }

    #[tokio::test]
    async fn s2_read_only_tool_auto_allowed_without_approval() {
        let adapter: Arc<dyn LLMAdapter> = Arc::new(ScriptedAdapter::new(vec![
            vec![
                LLMEvent::ToolCall {
                    id: "c1".into(),
                    name: "read_file".into(),
                    args: json!({ "path": "a.txt" }),
                    meta: None,
                },
                LLMEvent::Done { usage: None, response_id: None },
            ],
            vec![
                LLMEvent::TextDelta { content: "file says X".into() },
                LLMEvent::Done { usage: None, response_id: None },
            ],
        ]));
        let mut registry_inner = ToolRegistry::new();
        registry_inner.add(Arc::new(crate::tools::builtins::ReadFileTool::new()));
        let registry = Arc::new(registry_inner);
        let policy = Arc::new(PolicyEngine::new(vec![]));

        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "X").unwrap();
        let context: Arc<dyn ToolContext> =
            Arc::new(AgentToolContext::new("s1".into(), Some(tmp.path().to_path_buf())));
        let sessions = SessionManager::new();
        let session = sessions.get_or_create("u1", "c1");

        let events = collect(run_turn(
            adapter,
            registry,
            policy,
            context,
            session,
            Content::Text("what's in a.txt?".into()),
            None,
            DEFAULT_MAX_ITERATIONS,
            None,
        ))
        .await;

        assert!(matches!(&events[0], AgentEvent::ToolStart { name, .. } if name == "read_file"));
        assert!(matches!(&events[1], AgentEvent::ToolResult { result, .. } if result["success"] == true));
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::ToolPending { .. })));
        assert!(matches!(events.last().unwrap(), AgentEvent::Done { .. }));
    }

    #[tokio::test]
    async fn s3_shell_confirm_list_triggers_approval_and_user_allows() {
        let adapter: Arc<dyn LLMAdapter> = Arc::new(ScriptedAdapter::new(vec![vec![
            LLMEvent::ToolCall {
                id: "c1".into(),
                name: "shell".into(),
                args: json!({ "command": "rm -rf tmp" }),
                meta: None,
            },
            LLMEvent::Done { usage: None, response_id: None },
        ]]));
        let mut registry_inner = ToolRegistry::new();
        registry_inner.add(Arc::new(ShellTool::new()));
        let registry = Arc::new(registry_inner);
        let policy = Arc::new(PolicyEngine::new(vec![]));
        let context: Arc<dyn ToolContext> = Arc::new(AgentToolContext::new("s1".into(), None));
        let sessions = SessionManager::new();
        let session = sessions.get_or_create("u1", "c1");

        let always_allow: PermissionCallback = Arc::new(|_prompt| Box::pin(async { true }));

        let events = collect(run_turn(
            adapter,
            registry,
            policy,
            context,
            session,
            Content::Text("clean up".into()),
            None,
            DEFAULT_MAX_ITERATIONS,
            Some(always_allow),
        ))
        .await;

        assert!(matches!(&events[0], AgentEvent::ToolStart { .. }));
        match &events[1] {
            AgentEvent::ToolPending { prompt, .. } => assert!(prompt.contains("rm -rf tmp")),
            other => panic!("expected ToolPending, got {:?}", other),
        }
        match &events[2] {
            AgentEvent::ToolResult { result, .. } => assert_eq!(result["success"], true),
            other => panic!("expected ToolResult, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn s4_shell_safe_pattern_bypasses_approval() {
        let adapter: Arc<dyn LLMAdapter> = Arc::new(ScriptedAdapter::new(vec![vec![
            LLMEvent::ToolCall {
                id: "c1".into(),
                name: "shell".into(),
                args: json!({ "command": "date '+%Y-%m-%d'" }),
                meta: None,
            },
            LLMEvent::Done { usage: None, response_id: None },
        ]]));
        let mut registry_inner = ToolRegistry::new();
        registry_inner.add(Arc::new(ShellTool::new()));
        let registry = Arc::new(registry_inner);
        let policy = Arc::new(PolicyEngine::new(vec![]));
        let context: Arc<dyn ToolContext> = Arc::new(AgentToolContext::new("s1".into(), None));
        let sessions = SessionManager::new();
        let session = sessions.get_or_create("u1", "c1");

        let events = collect(run_turn(
            adapter,
            registry,
            policy,
            context,
            session,
            Content::Text("what's the date?".into()),
            None,
            DEFAULT_MAX_ITERATIONS,
            None, // no approval callback needed
        ))
        .await;

        assert!(matches!(&events[0], AgentEvent::ToolStart { .. }));
        assert!(matches!(&events[1], AgentEvent::ToolResult { result, .. } if result["success"] == true));
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::ToolPending { .. })));
    }

    #[tokio::test]
    async fn s5_denied_tool_round_trips_as_recoverable_error() {
        let adapter: Arc<dyn LLMAdapter> = Arc::new(ScriptedAdapter::new(vec![
            vec![
                LLMEvent::ToolCall {
                    id: "c1".into(),
                    name: "shell".into(),
                    args: json!({ "command": "ls" }),
                    meta: None,
                },
                LLMEvent::Done { usage: None, response_id: None },
            ],
            vec![
                LLMEvent::TextDelta { content: "sorry, can't do that".into() },
                LLMEvent::Done { usage: None, response_id: None },
            ],
        ]));
        let mut registry_inner = ToolRegistry::new();
        registry_inner.add(Arc::new(ShellTool::new()));
        let registry = Arc::new(registry_inner);
        let policy = Arc::new(PolicyEngine::new(vec![]));
        let context: Arc<dyn ToolContext> = Arc::new(AgentToolContext::new("s1".into(), None));
        let sessions = SessionManager::new();
        let session = sessions.get_or_create("u1", "c1");
        session.lock().await.denied_tools.insert("shell".to_string());

        let events = collect(run_turn(
            adapter,
            registry,
            policy,
            context,
            session,
            Content::Text("list files".into()),
            None,
            DEFAULT_MAX_ITERATIONS,
            None,
        ))
        .await;

        match &events[1] {
            AgentEvent::ToolResult { result, .. } => {
                assert_eq!(result["success"], false);
                assert!(result["error"].as_str().unwrap().contains("denied"));
            }
            other => panic!("expected ToolResult, got {:?}", other),
        }
        assert!(matches!(events.last().unwrap(), AgentEvent::Done { full_response } if full_response == "sorry, can't do that"));
    }

    #[tokio::test]
    async fn s6_iteration_cap_terminates_with_named_error() {
        let adapter: Arc<dyn LLMAdapter> = Arc::new(LoopingAdapter);
        let mut registry_inner = ToolRegistry::new();
        registry_inner.add(Arc::new(NoopTool));
        let registry = Arc::new(registry_inner);
        let policy = Arc::new(PolicyEngine::new(vec![]));
        let context: Arc<dyn ToolContext> = Arc::new(AgentToolContext::new("s1".into(), None));
        let sessions = SessionManager::new();
        let session = sessions.get_or_create("u1", "c1");

        let events = collect(run_turn(
            adapter,
            registry,
            policy,
            context,
            session,
            Content::Text("go forever".into()),
            None,
            3,
            None,
        ))
        .await;

        let tool_start_count = events.iter().filter(|e| matches!(e, AgentEvent::ToolStart { .. })).count();
        let tool_result_count = events.iter().filter(|e| matches!(e, AgentEvent::ToolResult { .. })).count();
        assert_eq!(tool_start_count, 3);
        assert_eq!(tool_result_count, 3);
        match events.last().unwrap() {
            AgentEvent::Error { message } => assert!(message.contains("Max iterations (3)")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn transport_error_is_terminal_and_does_not_persist_assistant_reply() {
        let adapter: Arc<dyn LLMAdapter> = Arc::new(ScriptedAdapter::new(vec![vec![
            LLMEvent::Error { message: "connection reset".into() },
        ]]));
        let registry = Arc::new(ToolRegistry::new());
        let policy = Arc::new(PolicyEngine::new(vec![]));
        let context: Arc<dyn ToolContext> = Arc::new(AgentToolContext::new("s1".into(), None));
        let sessions = SessionManager::new();
        let session = sessions.get_or_create("u1", "c1");

        let events = collect(run_turn(
            adapter,
            registry,
            policy,
            context,
            session.clone(),
            Content::Text("hi".into()),
            None,
            DEFAULT_MAX_ITERATIONS,
            None,
        ))
        .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AgentEvent::Error { message } if message == "connection reset"));

        let locked = session.lock().await;
        // user message retained, no assistant reply appended
        assert_eq!(locked.history.len(), 1);
    }

    #[tokio::test]
    async fn s7_bridge_correlation_under_concurrency_no_cross_talk() {
        use crate::permission_bridge::{
            PermissionBridge, PermissionDecision, PermissionHandler, PermissionRequest, RequesterContext,
        };
        use tokio::sync::mpsc;

        struct QueueingHandler {
            tx: mpsc::UnboundedSender<PermissionRequest>,
        }

        #[async_trait::async_trait]
        impl PermissionHandler for QueueingHandler {
            async fn handle(&self, request: PermissionRequest) -> anyhow::Result<()> {
                let _ = self.tx.send(request);
                Ok(())
            }
        }

        fn shell_rm_adapter() -> Arc<dyn LLMAdapter> {
            Arc::new(ScriptedAdapter::new(vec![
                vec![
                    LLMEvent::ToolCall {
                        id: "c1".into(),
                        name: "shell".into(),
                        args: json!({ "command": "rm -rf tmp" }),
                        meta: None,
                    },
                    LLMEvent::Done { usage: None, response_id: None },
                ],
                vec![
                    LLMEvent::TextDelta { content: "done".into() },
                    LLMEvent::Done { usage: None, response_id: None },
                ],
            ]))
        }

        fn permission_callback(bridge: Arc<PermissionBridge>, user_id: String) -> PermissionCallback {
            Arc::new(move |prompt: String| {
                let bridge = bridge.clone();
                let context = RequesterContext {
                    user_id: user_id.clone(),
                    channel_id: "c".into(),
                };
                Box::pin(async move { bridge.request(prompt, context).await == PermissionDecision::Allow })
            })
        }

        let bridge = Arc::new(PermissionBridge::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        bridge.register_handler(Arc::new(QueueingHandler { tx }));

        let mut registry_inner = ToolRegistry::new();
        registry_inner.add(Arc::new(ShellTool::new()));
        let registry = Arc::new(registry_inner);
        let policy = Arc::new(PolicyEngine::new(vec![]));
        let context: Arc<dyn ToolContext> = Arc::new(AgentToolContext::new("s7".into(), None));
        let sessions = SessionManager::new();
        let session_u1 = sessions.get_or_create("u1", "c1");
        let session_u2 = sessions.get_or_create("u2", "c2");

        let u1_task = tokio::spawn(collect(run_turn(
            shell_rm_adapter(),
            registry.clone(),
            policy.clone(),
            context.clone(),
            session_u1,
            Content::Text("clean u1".into()),
            None,
            DEFAULT_MAX_ITERATIONS,
            Some(permission_callback(bridge.clone(), "u1".into())),
        )));

        let u2_task = tokio::spawn(collect(run_turn(
            shell_rm_adapter(),
            registry.clone(),
            policy.clone(),
            context.clone(),
            session_u2,
            Content::Text("clean u2".into()),
            None,
            DEFAULT_MAX_ITERATIONS,
            Some(permission_callback(bridge.clone(), "u2".into())),
        )));

        let first = rx.recv().await.expect("first permission request");
        let second = rx.recv().await.expect("second permission request");
        let (u2_request, u1_request) = if first.context.user_id == "u2" {
            (first, second)
        } else {
            (second, first)
        };
        assert_ne!(u1_request.id, u2_request.id);

        // Resolve U2 first with allow, then U1 with deny: cross order from
        // request arrival, to prove each resolution only unblocks its own
        // waiter.
        bridge.resolve_request(&u2_request.id, PermissionDecision::Allow);
        bridge.resolve_request(&u1_request.id, PermissionDecision::Deny);

        let u1_events = u1_task.await.unwrap();
        let u2_events = u2_task.await.unwrap();

        match &u1_events[2] {
            AgentEvent::ToolResult { result, .. } => {
                assert_eq!(result["success"], false);
                assert!(result["error"].as_str().unwrap().to_lowercase().contains("denied"));
            }
            other => panic!("expected denied ToolResult for u1, got {:?}", other),
        }

        match &u2_events[2] {
            AgentEvent::ToolResult { result, .. } => assert_eq!(result["success"], true),
            other => panic!("expected successful ToolResult for u2, got {:?}", other),
        }
    }
}
