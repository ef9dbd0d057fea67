//! Skills are markdown documents with YAML frontmatter (`SKILL.md`) living
//! one-per-subdirectory under a configured skills directory. The agent can
//! list what's available (`list_skills`) and fetch one body on demand
//! (`read_skill`) — see `DESIGN.md`'s Open Question decision on lazy loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const SKILL_FILENAME: &str = "SKILL.md";

#[derive(Debug, Clone, Deserialize)]
pub struct SkillMetadata {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Skill {
    pub path: PathBuf,
    pub metadata: SkillMetadata,
    pub content: String,
}

/// Parses one `SKILL.md` file. `name`/`description` are required in the
/// frontmatter; anything else is optional.
pub fn parse_skill_file(path: &Path) -> anyhow::Result<Skill> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;

    let parsed = gray_matter::Matter::<gray_matter::engine::YAML>::new().parse::<SkillMetadata>(&raw)?;
    let metadata = parsed
        .data
        .ok_or_else(|| anyhow::anyhow!("missing YAML frontmatter in {}", path.display()))?;

    if metadata.name.trim().is_empty() {
        anyhow::bail!("skill 'name' is required in {}", path.display());
    }
    if metadata.description.trim().is_empty() {
        anyhow::bail!("skill 'description' is required in {}", path.display());
    }

    let skill_dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("cannot determine skill directory from {}", path.display()))?
        .to_path_buf();

    Ok(Skill {
        path: skill_dir,
        metadata,
        content: parsed.content,
    })
}

/// Scans the immediate subdirectories of `skills_dir` for `SKILL.md` files.
/// Non-recursive beyond one level; a missing directory yields an empty list
/// rather than an error (skills are optional).
pub fn discover(skills_dir: &Path) -> anyhow::Result<Vec<Skill>> {
    if !skills_dir.exists() {
        return Ok(Vec::new());
    }

    let mut skills = Vec::new();
    for entry in std::fs::read_dir(skills_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let skill_file = entry.path().join(SKILL_FILENAME);
        if !skill_file.exists() {
            continue;
        }
        match parse_skill_file(&skill_file) {
            Ok(skill) => skills.push(skill),
            Err(e) => log::warn!("failed to parse skill at {}: {}", skill_file.display(), e),
        }
    }
    skills.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
    Ok(skills)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discovers_skill_with_frontmatter() {
        let dir = TempDir::new().unwrap();
        let skill_dir = dir.path().join("greeting");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(
            skill_dir.join(SKILL_FILENAME),
            "---\nname: greeting\ndescription: says hello\n---\n# Greeting\nSay hi.\n",
        )
        .unwrap();

        let skills = discover(dir.path()).unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].metadata.name, "greeting");
        assert!(skills[0].content.contains("Say hi."));
    }

    #[test]
    fn missing_skills_dir_is_empty_not_an_error() {
        let skills = discover(Path::new("/nonexistent/skills/dir")).unwrap();
        assert!(skills.is_empty());
    }

    #[test]
    fn skill_without_description_is_rejected() {
        let dir = TempDir::new().unwrap();
        let skill_dir = dir.path().join("broken");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join(SKILL_FILENAME), "---\nname: broken\n---\nbody").unwrap();

        // discover() logs and skips rather than propagating
        let skills = discover(dir.path()).unwrap();
        assert!(skills.is_empty());
    }
}
