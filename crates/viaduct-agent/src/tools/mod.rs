pub mod builtins;
pub mod context;
pub mod registry;

pub use context::{CapabilityRequirement, Tool, ToolContext, ToolError};
pub use registry::ToolRegistry;

use std::path::{Path, PathBuf};

/// The `ToolContext` implementation backing the CLI and tests: a working
/// directory plus an optional skills directory, nothing more.
pub struct AgentToolContext {
    session_id: String,
    cwd: Option<PathBuf>,
    skills_dir: Option<PathBuf>,
}

impl AgentToolContext {
    pub fn new(session_id: String, cwd: Option<PathBuf>) -> Self {
        AgentToolContext {
            session_id,
            cwd,
            skills_dir: None,
        }
    }

    pub fn with_skills_dir(mut self, skills_dir: PathBuf) -> Self {
        self.skills_dir = Some(skills_dir);
        self
    }
}

#[async_trait::async_trait]
impl ToolContext for AgentToolContext {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn skills_dir(&self) -> Option<&Path> {
        self.skills_dir.as_deref()
    }
}
