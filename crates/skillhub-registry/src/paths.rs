//! Storage layout for skillhub
//!
//! All hubs live under a single storage root:
//!
//! ```text
//! <storage>/master-config.json        selector: which hub is active
//! <storage>/hubs/<hub>/config.json    context cells and toggles
//! <storage>/hubs/<hub>/contexts/...   context cell folders holding skills
//! ```
//!
//! A legacy flat skills directory is consulted only when a name cannot be
//! resolved against the active hub.

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

const STORAGE_DIR_NAME: &str = "contextmanager";
const HUBS_DIR_NAME: &str = "hubs";
const SELECTOR_FILE_NAME: &str = "master-config.json";
const LEGACY_RESOURCES_DIR_NAME: &str = "skills-resources";
const LEGACY_SKILLS_DIR_NAME: &str = "skills";

/// Hub configuration file inside an active hub root
pub const HUB_CONFIG_FILE: &str = "config.json";

/// Directory holding context cell folders inside an active hub root
pub const CONTEXTS_DIR: &str = "contexts";

/// Filesystem locations used by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubPaths {
    /// Storage root holding the selector and all hubs
    pub storage_dir: PathBuf,

    /// Directory containing one folder per hub
    pub hubs_dir: PathBuf,

    /// Selector document path
    pub selector_path: PathBuf,

    /// Legacy flat skills directory
    pub legacy_skills_dir: PathBuf,
}

impl HubPaths {
    /// Create paths under the user's home directory
    ///
    /// - Storage: ~/contextmanager
    /// - Legacy skills: ~/skills-resources/skills
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        let home = base_dirs.home_dir();

        let mut paths = Self::storage_at(home.join(STORAGE_DIR_NAME));
        paths.legacy_skills_dir = home
            .join(LEGACY_RESOURCES_DIR_NAME)
            .join(LEGACY_SKILLS_DIR_NAME);
        Ok(paths)
    }

    /// Create paths with custom root directory
    ///
    /// Useful for testing or custom installations. The legacy skills
    /// directory is placed under the root as well.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let mut paths = Self::storage_at(root.to_path_buf());
        paths.legacy_skills_dir = root
            .join(LEGACY_RESOURCES_DIR_NAME)
            .join(LEGACY_SKILLS_DIR_NAME);
        paths
    }

    fn storage_at(storage_dir: PathBuf) -> Self {
        Self {
            hubs_dir: storage_dir.join(HUBS_DIR_NAME),
            selector_path: storage_dir.join(SELECTOR_FILE_NAME),
            legacy_skills_dir: storage_dir.join(LEGACY_SKILLS_DIR_NAME),
            storage_dir,
        }
    }

    /// Root directory of a named hub
    pub fn hub_root(&self, hub: &str) -> PathBuf {
        self.hubs_dir.join(hub)
    }

    /// Display paths for informational purposes
    pub fn display(&self) -> String {
        format!(
            "Skill hub paths:
  Storage directory: {}
  Hubs directory:    {}
  Selector file:     {}
  Legacy skills:     {}",
            self.storage_dir.display(),
            self.hubs_dir.display(),
            self.selector_path.display(),
            self.legacy_skills_dir.display()
        )
    }
}

/// Configuration overrides for paths
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct PathsConfig {
    /// Override storage root (moves hubs and selector with it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Override hubs directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hubs_dir: Option<PathBuf>,

    /// Override selector file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector_path: Option<PathBuf>,

    /// Override legacy skills directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_skills_dir: Option<PathBuf>,
}

impl PathsConfig {
    /// Apply overrides to default paths
    pub fn apply_to(&self, mut paths: HubPaths) -> HubPaths {
        if let Some(ref storage_dir) = self.storage_dir {
            let legacy = paths.legacy_skills_dir;
            paths = HubPaths::storage_at(storage_dir.clone());
            paths.legacy_skills_dir = legacy;
        }
        if let Some(ref hubs_dir) = self.hubs_dir {
            paths.hubs_dir = hubs_dir.clone();
        }
        if let Some(ref selector_path) = self.selector_path {
            paths.selector_path = selector_path.clone();
        }
        if let Some(ref legacy_skills_dir) = self.legacy_skills_dir {
            paths.legacy_skills_dir = legacy_skills_dir.clone();
        }
        paths
    }
}

/// Get path overrides from environment variables
///
/// - SKILLHUB_STORAGE_DIR
/// - SKILLHUB_HUBS_DIR
/// - SKILLHUB_SELECTOR_PATH
/// - SKILLHUB_LEGACY_SKILLS_DIR
pub fn paths_from_env() -> PathsConfig {
    PathsConfig {
        storage_dir: std::env::var("SKILLHUB_STORAGE_DIR").ok().map(PathBuf::from),
        hubs_dir: std::env::var("SKILLHUB_HUBS_DIR").ok().map(PathBuf::from),
        selector_path: std::env::var("SKILLHUB_SELECTOR_PATH")
            .ok()
            .map(PathBuf::from),
        legacy_skills_dir: std::env::var("SKILLHUB_LEGACY_SKILLS_DIR")
            .ok()
            .map(PathBuf::from),
    }
}
