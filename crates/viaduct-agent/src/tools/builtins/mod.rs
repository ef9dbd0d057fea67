pub mod edit_file;
pub mod list_skills;
pub mod read_file;
pub mod read_skill;
pub mod shell;
pub mod write_file;

pub use edit_file::EditFileTool;
pub use list_skills::ListSkillsTool;
pub use read_file::ReadFileTool;
pub use read_skill::ReadSkillTool;
pub use shell::ShellTool;
pub use write_file::WriteFileTool;

use crate::tools::Tool;
use std::sync::Arc;

/// The canonical set of built-in tools the CLI registers by default.
pub fn all_builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ShellTool::new()),
        Arc::new(ReadFileTool::new()),
        Arc::new(WriteFileTool::new()),
        Arc::new(EditFileTool::new()),
        Arc::new(ListSkillsTool::new()),
        Arc::new(ReadSkillTool::new()),
    ]
}
