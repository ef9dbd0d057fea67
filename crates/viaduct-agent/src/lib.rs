//! Tool Registry & Executor, Policy Engine, Permission Bridge, Session
//! Manager, and Agent Orchestrator: the five components the `viaduct`
//! LLM Protocol Layer is wired up to, plus the built-in tool set.

pub mod agent_event;
pub mod channel;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod orchestrator;
pub mod permission_bridge;
pub mod policy;
pub mod session;
pub mod skills;
pub mod tool_schema;
pub mod tools;

pub use agent_event::AgentEvent;
pub use channel::{Channel, MessageHandler, ReplySink};
pub use error::AgentError;
pub use executor::ToolResult;
pub use gateway::{Gateway, GatewayConfig};
pub use orchestrator::{run_turn, PermissionCallback, DEFAULT_MAX_ITERATIONS};
pub use permission_bridge::{
    PermissionBridge, PermissionDecision, PermissionHandler, PermissionRequest, RequesterContext,
};
pub use policy::{PolicyDecision, PolicyEngine, PolicyRule, PolicySession};
pub use session::{Session, SessionHandle, SessionManager};
pub use tools::{AgentToolContext, Tool, ToolContext, ToolRegistry};
