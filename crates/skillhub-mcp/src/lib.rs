//! MCP Server Façade using Official rmcp SDK
//!
//! Exposes skill discovery and context assembly to the host agent:
//! - list_available_skills: enabled skills with descriptions and modes
//! - get_default_skills: bundle of every always-loaded skill
//! - load_full_skill_context: one skill with all of its resources
//! - list_skill_files / load_skill_file: selective access to a skill's files
//! - get_hub_status: which hub is active and what it enables
//!
//! Every call re-resolves the active hub, so switching hubs or toggling
//! skills in the editor takes effect on the next tool call.

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, Json, ServerHandler,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use skillhub_core::{HubStatus, SkillSummary};
use skillhub_registry::normalize_skill_name;
use skillhub_skillstore::SkillStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The MCP server that exposes skill discovery and loading tools
#[derive(Clone)]
pub struct SkillsServer {
    skill_store: Arc<SkillStore>,
    tool_router: ToolRouter<Self>,
}

/// Output schema for list_available_skills
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkillListOutput {
    /// Enabled skills and workflows, sorted by name
    pub skills: Vec<SkillSummary>,
}

/// Input schema for load_full_skill_context and list_skill_files
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkillNameInput {
    /// Skill folder name, as returned by list_available_skills
    pub name: String,
}

/// Input schema for load_skill_file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoadFileInput {
    /// Skill folder name
    pub name: String,

    /// Path relative to the skill folder
    #[schemars(description = "Path relative to the skill folder, e.g. references/api.md")]
    pub relative_path: String,
}

/// Output schema for list_skill_files
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FileListOutput {
    pub name: String,
    pub files: Vec<String>,
}

impl SkillsServer {
    pub fn new(skill_store: Arc<SkillStore>) -> Self {
        SkillsServer {
            skill_store,
            tool_router: Self::tool_router(),
        }
    }

    pub fn skill_store(&self) -> &Arc<SkillStore> {
        &self.skill_store
    }
}

#[tool_router]
impl SkillsServer {
    /// List enabled skills so the agent can decide what to load
    #[tool(
        name = "list_available_skills",
        description = "List all enabled skills and workflows in the active hub with their description, mode (always_loaded or dynamic) and type. Use this to decide which dynamic skills to load."
    )]
    async fn list_available_skills(&self) -> Result<Json<SkillListOutput>, String> {
        let skills = self.skill_store.list_descriptors();
        info!("list_available_skills returned {} skills", skills.len());
        Ok(Json(SkillListOutput { skills }))
    }

    #[tool(
        name = "get_default_skills",
        description = "Load the full context of every always_loaded skill in the active hub. Call this once at the start of a session."
    )]
    async fn get_default_skills(&self) -> Result<String, String> {
        debug!("get_default_skills called");
        Ok(self.skill_store.assemble_always_loaded())
    }

    /// Load one skill with all of its resources
    #[tool(
        name = "load_full_skill_context",
        description = "Load the complete context of a skill: the main skill file followed by every additional root file and subfolder resource."
    )]
    async fn load_full_skill_context(
        &self,
        input: Parameters<SkillNameInput>,
    ) -> Result<String, String> {
        debug!("load_full_skill_context called for: {}", input.0.name);

        self.skill_store.assemble_one(&input.0.name).map_err(|e| {
            warn!("Failed to load skill {}: {}", input.0.name, e);
            format!("Failed to load skill: {}", e)
        })
    }

    #[tool(
        name = "list_skill_files",
        description = "List the files of a skill, relative to the skill folder, in the order they are assembled."
    )]
    async fn list_skill_files(
        &self,
        input: Parameters<SkillNameInput>,
    ) -> Result<Json<FileListOutput>, String> {
        debug!("list_skill_files called for: {}", input.0.name);

        let name = normalize_skill_name(&input.0.name)
            .map_err(|e| format!("Failed to list skill files: {}", e))?;
        let files = self
            .skill_store
            .list_files(&name)
            .map_err(|e| format!("Failed to list skill files: {}", e))?;

        Ok(Json(FileListOutput { name, files }))
    }

    /// Load a single file from a skill
    #[tool(
        name = "load_skill_file",
        description = "Load a single file from a skill by its path relative to the skill folder. Paths outside the skill folder are rejected."
    )]
    async fn load_skill_file(&self, input: Parameters<LoadFileInput>) -> Result<String, String> {
        let LoadFileInput {
            name,
            relative_path,
        } = input.0;
        debug!("load_skill_file called for: {}/{}", name, relative_path);

        self.skill_store
            .read_one_file(&name, &relative_path)
            .map_err(|e| format!("Failed to load file: {}", e))
    }

    #[tool(
        name = "get_hub_status",
        description = "Show the active hub, its configuration file and how many context cells, skills and workflows are enabled."
    )]
    async fn get_hub_status(&self) -> Result<Json<HubStatus>, String> {
        Ok(Json(self.skill_store.registry().hub_status()))
    }
}

#[tool_handler]
impl ServerHandler for SkillsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "skillhub".to_string(),
                title: Some("Skill Hub".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Serves layered skills from the active skill hub. \
                Usage: (1) get_default_skills at session start, (2) list_available_skills \
                to see dynamic skills, (3) load_full_skill_context or load_skill_file \
                to pull in what the task needs."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}
