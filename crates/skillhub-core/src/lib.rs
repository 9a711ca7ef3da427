//! Core types for skillhub
//!
//! Shared data model for the skill hub:
//! - Selector document (which hub is active)
//! - Configuration document (ordered context cells with skill/workflow toggles)
//! - Derived skill descriptors and discovery summaries
//! - The caller-facing error taxonomy

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Primary skill file, checked first
pub const PRIMARY_FILE: &str = "skill.md";

/// Upper-case variant of the primary skill file
pub const PRIMARY_FILE_UPPER: &str = "SKILL.md";

/// Legacy description file. Superseded by the primary file's frontmatter.
pub const LEGACY_METADATA_FILE: &str = "description.md";

/// Hub used when the selector document is missing or unusable
pub const DEFAULT_HUB: &str = "MySkillHub";

/// Description returned when a skill declares none
pub const NO_DESCRIPTION: &str = "No description provided.";

/// Description returned when the primary file could not be read
pub const DESCRIPTION_READ_ERROR: &str = "Error reading skill.md frontmatter";

#[derive(Error, Debug)]
pub enum SkillHubError {
    #[error("Invalid skill name: {0}")]
    InvalidName(String),

    #[error("No skill folder found with name: {name} (available: {})", .available.join(", "))]
    NotFound { name: String, available: Vec<String> },

    #[error("Invalid path: {0}")]
    PathEscape(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SkillHubError>;

/// Which toggle namespace a folder was enabled under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    Skill,
    Workflow,
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillKind::Skill => write!(f, "skill"),
            SkillKind::Workflow => write!(f, "workflow"),
        }
    }
}

/// Loading mode of an enabled skill or workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Included in the default bundle
    #[default]
    AlwaysLoaded,
    /// Loaded only on explicit request
    Dynamic,
}

impl LoadMode {
    /// Parse a mode string. `default` is the pre-rename spelling of
    /// `always_loaded`; anything unrecognised is never auto-loaded.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "always_loaded" | "default" => LoadMode::AlwaysLoaded,
            "dynamic" => LoadMode::Dynamic,
            other => {
                warn!("Unknown skill mode '{}', treating as dynamic", other);
                LoadMode::Dynamic
            }
        }
    }
}

impl<'de> Deserialize<'de> for LoadMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(LoadMode::parse).unwrap_or_default())
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::AlwaysLoaded => write!(f, "always_loaded"),
            LoadMode::Dynamic => write!(f, "dynamic"),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_hub() -> String {
    DEFAULT_HUB.to_string()
}

/// Per-name toggle inside a context cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub mode: LoadMode,
}

impl Default for ToggleEntry {
    fn default() -> Self {
        ToggleEntry {
            enabled: true,
            mode: LoadMode::AlwaysLoaded,
        }
    }
}

/// An independently enable-able folder group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextCell {
    /// Display name, as written by the hub editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Folder relative to the hub's contexts directory
    #[serde(default)]
    pub folder: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub skills: HashMap<String, ToggleEntry>,

    #[serde(default)]
    pub workflows: HashMap<String, ToggleEntry>,
}

impl ContextCell {
    /// Look up the toggle for a folder name. The skills map is consulted
    /// before the workflows map.
    pub fn toggle_for(&self, name: &str) -> Option<(SkillKind, &ToggleEntry)> {
        if let Some(toggle) = self.skills.get(name) {
            return Some((SkillKind::Skill, toggle));
        }
        self.workflows
            .get(name)
            .map(|toggle| (SkillKind::Workflow, toggle))
    }
}

/// A hub's `config.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawConfigDocument")]
pub struct ConfigDocument {
    pub context_cells: Vec<ContextCell>,
}

/// On-disk shape. Older configurations used `contexts` for the same list;
/// `context_cells` wins when both are present.
#[derive(Deserialize)]
struct RawConfigDocument {
    #[serde(default)]
    context_cells: Option<Vec<ContextCell>>,

    #[serde(default)]
    contexts: Option<Vec<ContextCell>>,
}

impl From<RawConfigDocument> for ConfigDocument {
    fn from(raw: RawConfigDocument) -> Self {
        ConfigDocument {
            context_cells: raw.context_cells.or(raw.contexts).unwrap_or_default(),
        }
    }
}

/// The storage root's `master-config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorDocument {
    #[serde(default = "default_hub", alias = "active_id")]
    pub active_hub: String,

    #[serde(default)]
    pub hubs: Vec<String>,
}

impl Default for SelectorDocument {
    fn default() -> Self {
        SelectorDocument {
            active_hub: default_hub(),
            hubs: vec![default_hub()],
        }
    }
}

/// An enabled skill or workflow folder, derived fresh on every read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDescriptor {
    /// Folder name
    pub name: String,
    pub kind: SkillKind,
    pub mode: LoadMode,
    /// Skill directory. Never owned or written, only read.
    pub path: PathBuf,
}

/// Discovery payload the agent host uses to decide what to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
    pub mode: LoadMode,
    #[serde(rename = "type")]
    pub kind: SkillKind,
}

/// Snapshot of the active hub for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HubStatus {
    pub active_hub: String,
    pub active_root: String,
    pub config_path: String,
    pub context_cells: usize,
    pub enabled_cells: usize,
    pub skills: usize,
    pub workflows: usize,
}
