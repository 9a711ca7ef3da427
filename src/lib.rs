//! skillhub - layered skill discovery and context assembly for AI agents.
//!
//! Skills live as folders inside context cells of a skill hub. The active hub
//! decides which of them an agent sees, and each skill is assembled into a
//! single delimited text document on request:
//! - `Registry`: resolves the active hub and its enabled skills
//! - `SkillStore`: frontmatter parsing, content classification and assembly
//! - `SkillsServer`: the MCP tool surface

pub use skillhub_core::*;
pub use skillhub_mcp::{FileListOutput, LoadFileInput, SkillListOutput, SkillNameInput, SkillsServer};
pub use skillhub_registry::{normalize_skill_name, paths, Registry};
pub use skillhub_skillstore::{
    classify, frontmatter, FileSection, PrimarySection, SkillStore, LEGACY_FILE_REJECTION,
    NO_ALWAYS_LOADED,
};
