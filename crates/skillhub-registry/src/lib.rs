//! Configuration Resolver
//!
//! Decides which skill and workflow folders are currently visible:
//! - reads the selector document to find the active hub
//! - reads the hub's layered configuration (context cells + toggles)
//! - walks each enabled cell's folder and keeps only toggled-on entries
//!
//! Nothing is cached. Every call re-reads the selector, the configuration and
//! the directory tree, so edits made by the hub editor apply immediately.

pub mod paths;

use paths::{HubPaths, CONTEXTS_DIR, HUB_CONFIG_FILE};
use skillhub_core::{
    ConfigDocument, HubStatus, Result, SelectorDocument, SkillDescriptor, SkillHubError,
    SkillKind, DEFAULT_HUB,
};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, warn};

/// Resolves the active hub and its enabled skills
#[derive(Debug, Clone)]
pub struct Registry {
    paths: HubPaths,
}

impl Registry {
    pub fn new(paths: HubPaths) -> Self {
        Registry { paths }
    }

    pub fn paths(&self) -> &HubPaths {
        &self.paths
    }

    /// Read the selector document. Never fails: a missing or corrupt file
    /// yields the default selector.
    pub fn read_selector(&self) -> SelectorDocument {
        let path = &self.paths.selector_path;
        if !path.exists() {
            debug!("Selector not found at {}, using default hub", path.display());
            return SelectorDocument::default();
        }

        let selector = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                serde_json::from_str::<SelectorDocument>(&raw).map_err(|e| e.to_string())
            });

        match selector {
            Ok(selector) => selector,
            Err(e) => {
                error!("Error reading selector {}: {}", path.display(), e);
                SelectorDocument::default()
            }
        }
    }

    /// Name of the active hub
    pub fn active_hub(&self) -> String {
        let selector = self.read_selector();
        if is_plain_name(&selector.active_hub) {
            selector.active_hub
        } else {
            warn!(
                "Ignoring unusable active hub '{}', using {}",
                selector.active_hub, DEFAULT_HUB
            );
            DEFAULT_HUB.to_string()
        }
    }

    /// Root directory of the active hub
    pub fn resolve_active_root(&self) -> PathBuf {
        self.paths.hub_root(&self.active_hub())
    }

    /// Load the active hub's configuration. Missing or malformed files yield
    /// an empty document.
    pub fn load_config(&self) -> ConfigDocument {
        load_config_at(&self.resolve_active_root())
    }

    /// All enabled skills and workflows, in configuration order.
    ///
    /// Cells are visited in document order; within a cell, subdirectories
    /// are visited sorted by name. A directory is emitted only when its cell
    /// is enabled and it has an enabled toggle in `skills` or `workflows`
    /// (`skills` checked first).
    pub fn enabled_entries(&self) -> Vec<SkillDescriptor> {
        let root = self.resolve_active_root();
        let contexts_dir = root.join(CONTEXTS_DIR);
        let config = load_config_at(&root);
        let mut entries = Vec::new();

        for cell in &config.context_cells {
            if !cell.enabled {
                continue;
            }

            if !is_confined(&cell.folder) {
                warn!(
                    "Skipping context cell folder outside contexts directory: {}",
                    cell.folder
                );
                continue;
            }

            let cell_dir = contexts_dir.join(&cell.folder);
            if !cell_dir.is_dir() {
                debug!("Context cell folder missing: {}", cell_dir.display());
                continue;
            }

            for (name, path) in subdirectories(&cell_dir) {
                let Some((kind, toggle)) = cell.toggle_for(&name) else {
                    continue;
                };
                if !toggle.enabled {
                    continue;
                }

                entries.push(SkillDescriptor {
                    name,
                    kind,
                    mode: toggle.mode,
                    path,
                });
            }
        }

        entries
    }

    /// Resolve a skill name to its directory.
    ///
    /// The name is trimmed of whitespace and quotes and validated before any
    /// filesystem access. Enabled entries are searched first, then the
    /// legacy flat directory. When two cells enable the same name, the one
    /// later in configuration order wins.
    pub fn skill_dir_for(&self, name: &str) -> Result<PathBuf> {
        let name = normalize_skill_name(name)?;
        let entries = self.enabled_entries();

        if let Some(entry) = entries.iter().rev().find(|e| e.name == name) {
            debug!("Resolved skill '{}' to: {}", name, entry.path.display());
            return Ok(entry.path.clone());
        }

        let legacy_dir = self.paths.legacy_skills_dir.join(&name);
        if legacy_dir.is_dir() {
            debug!("Resolved skill '{}' from legacy directory", name);
            return Ok(legacy_dir);
        }

        let available: Vec<String> = entries.into_iter().map(|e| e.name).collect();
        error!("Skill not found: {}. Available: {:?}", name, available);
        Err(SkillHubError::NotFound { name, available })
    }

    /// Summary of the active hub
    pub fn hub_status(&self) -> HubStatus {
        let active_hub = self.active_hub();
        let active_root = self.paths.hub_root(&active_hub);
        let config = load_config_at(&active_root);
        let entries = self.enabled_entries();

        HubStatus {
            active_hub,
            config_path: active_root.join(HUB_CONFIG_FILE).display().to_string(),
            active_root: active_root.display().to_string(),
            context_cells: config.context_cells.len(),
            enabled_cells: config.context_cells.iter().filter(|c| c.enabled).count(),
            skills: entries
                .iter()
                .filter(|e| e.kind == SkillKind::Skill)
                .count(),
            workflows: entries
                .iter()
                .filter(|e| e.kind == SkillKind::Workflow)
                .count(),
        }
    }
}

/// Trim surrounding whitespace and quote characters, then reject empty names
/// and anything that could traverse directories.
pub fn normalize_skill_name(raw: &str) -> Result<String> {
    let name = raw.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'');

    if name.is_empty() {
        return Err(SkillHubError::InvalidName(
            "Skill name cannot be empty".to_string(),
        ));
    }

    if !is_plain_name(name) {
        return Err(SkillHubError::InvalidName(name.to_string()));
    }

    Ok(name.to_string())
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

/// A cell folder must stay inside the contexts directory
fn is_confined(folder: &str) -> bool {
    Path::new(folder)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn load_config_at(root: &Path) -> ConfigDocument {
    let path = root.join(HUB_CONFIG_FILE);
    if !path.exists() {
        debug!("Hub config not found: {}", path.display());
        return ConfigDocument::default();
    }

    let config = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str::<ConfigDocument>(&raw).map_err(|e| e.to_string()));

    match config {
        Ok(config) => config,
        Err(e) => {
            error!("Error reading config {}: {}", path.display(), e);
            ConfigDocument::default()
        }
    }
}

/// Immediate subdirectories sorted by name
fn subdirectories(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut dirs: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_dir() {
                return None;
            }
            match entry.file_name().into_string() {
                Ok(name) => Some((name, path)),
                Err(raw) => {
                    debug!("Skipping non UTF-8 directory name: {:?}", raw);
                    None
                }
            }
        })
        .collect();

    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skillhub_core::LoadMode;
    use tempfile::TempDir;

    fn write_selector(paths: &HubPaths, hub: &str) {
        std::fs::create_dir_all(&paths.storage_dir).unwrap();
        std::fs::write(
            &paths.selector_path,
            json!({ "active_hub": hub, "hubs": [hub] }).to_string(),
        )
        .unwrap();
    }

    fn write_config(paths: &HubPaths, hub: &str, config: serde_json::Value) {
        let root = paths.hub_root(hub);
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("config.json"), config.to_string()).unwrap();
    }

    fn make_dirs(paths: &HubPaths, hub: &str, folder: &str, names: &[&str]) {
        for name in names {
            std::fs::create_dir_all(paths.hub_root(hub).join("contexts").join(folder).join(name))
                .unwrap();
        }
    }

    fn names(entries: &[SkillDescriptor]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_missing_selector_uses_default_hub() {
        let temp = TempDir::new().unwrap();
        let registry = Registry::new(HubPaths::with_root(temp.path()));

        assert_eq!(registry.active_hub(), DEFAULT_HUB);
        assert_eq!(
            registry.resolve_active_root(),
            temp.path().join("hubs").join(DEFAULT_HUB)
        );
    }

    #[test]
    fn test_corrupt_selector_uses_default_hub() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        std::fs::write(&paths.selector_path, "{ not json").unwrap();

        let registry = Registry::new(paths);
        assert_eq!(registry.active_hub(), DEFAULT_HUB);
    }

    #[test]
    fn test_traversing_hub_name_is_ignored() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        write_selector(&paths, "../outside");

        let registry = Registry::new(paths);
        assert_eq!(registry.active_hub(), DEFAULT_HUB);
    }

    #[test]
    fn test_selector_change_applies_without_restart() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        let registry = Registry::new(paths.clone());

        write_selector(&paths, "Work");
        assert_eq!(registry.active_hub(), "Work");

        write_selector(&paths, "Home");
        assert_eq!(registry.active_hub(), "Home");
    }

    #[test]
    fn test_malformed_config_is_empty() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        let root = paths.hub_root(DEFAULT_HUB);
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("config.json"), "[1, 2").unwrap();

        let registry = Registry::new(paths);
        assert!(registry.load_config().context_cells.is_empty());
        assert!(registry.enabled_entries().is_empty());
    }

    #[test]
    fn test_config_with_both_cell_keys_keeps_current_cells() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        make_dirs(&paths, DEFAULT_HUB, "dev", &["rust"]);
        write_config(
            &paths,
            DEFAULT_HUB,
            json!({
                "context_cells": [{"folder": "dev", "skills": {"rust": {}}}],
                "contexts": []
            }),
        );

        let registry = Registry::new(paths);
        assert_eq!(names(&registry.enabled_entries()), vec!["rust"]);
    }

    #[test]
    fn test_enabled_entries_respects_toggles() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        make_dirs(
            &paths,
            DEFAULT_HUB,
            "dev",
            &["rust", "python", "untoggled", "deploy", "off"],
        );
        write_config(
            &paths,
            DEFAULT_HUB,
            json!({
                "context_cells": [{
                    "folder": "dev",
                    "enabled": true,
                    "skills": {
                        "rust": {"enabled": true, "mode": "always_loaded"},
                        "python": {"enabled": true, "mode": "dynamic"},
                        "off": {"enabled": false}
                    },
                    "workflows": {
                        "deploy": {"enabled": true, "mode": "dynamic"}
                    }
                }]
            }),
        );

        let registry = Registry::new(paths);
        let entries = registry.enabled_entries();

        assert_eq!(names(&entries), vec!["deploy", "python", "rust"]);
        assert_eq!(entries[0].kind, SkillKind::Workflow);
        assert_eq!(entries[0].mode, LoadMode::Dynamic);
        assert_eq!(entries[2].kind, SkillKind::Skill);
        assert_eq!(entries[2].mode, LoadMode::AlwaysLoaded);
    }

    #[test]
    fn test_disabled_cell_and_missing_folder_are_skipped() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        make_dirs(&paths, DEFAULT_HUB, "a", &["one"]);
        make_dirs(&paths, DEFAULT_HUB, "b", &["two"]);
        write_config(
            &paths,
            DEFAULT_HUB,
            json!({
                "context_cells": [
                    {"folder": "a", "enabled": false, "skills": {"one": {}}},
                    {"folder": "missing", "skills": {"ghost": {}}},
                    {"folder": "b", "skills": {"two": {}}}
                ]
            }),
        );

        let registry = Registry::new(paths);
        assert_eq!(names(&registry.enabled_entries()), vec!["two"]);
    }

    #[test]
    fn test_cell_folder_cannot_escape_contexts() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        std::fs::create_dir_all(paths.hub_root(DEFAULT_HUB).join("escaped")).unwrap();
        write_config(
            &paths,
            DEFAULT_HUB,
            json!({
                "context_cells": [{"folder": "..", "skills": {"escaped": {}}}]
            }),
        );

        let registry = Registry::new(paths);
        assert!(registry.enabled_entries().is_empty());
    }

    #[test]
    fn test_enabled_entries_is_stable() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        make_dirs(&paths, DEFAULT_HUB, "x", &["c", "a", "b"]);
        write_config(
            &paths,
            DEFAULT_HUB,
            json!({
                "context_cells": [{"folder": "x", "skills": {"a": {}, "b": {}, "c": {}}}]
            }),
        );

        let registry = Registry::new(paths);
        assert_eq!(registry.enabled_entries(), registry.enabled_entries());
    }

    #[test]
    fn test_normalize_skill_name() {
        assert_eq!(normalize_skill_name("  'rust'  ").unwrap(), "rust");
        assert_eq!(normalize_skill_name("\"rust\"").unwrap(), "rust");

        for bad in ["", "  ", "''", "../x", "a/../../b", "a/b", "a\\b", ".."] {
            assert!(
                matches!(normalize_skill_name(bad), Err(SkillHubError::InvalidName(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_skill_dir_lookup_and_legacy_fallback() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        make_dirs(&paths, DEFAULT_HUB, "dev", &["rust"]);
        write_config(
            &paths,
            DEFAULT_HUB,
            json!({"context_cells": [{"folder": "dev", "skills": {"rust": {}}}]}),
        );
        std::fs::create_dir_all(paths.legacy_skills_dir.join("old-skill")).unwrap();

        let registry = Registry::new(paths.clone());
        assert_eq!(
            registry.skill_dir_for("rust").unwrap(),
            paths.hub_root(DEFAULT_HUB).join("contexts/dev/rust")
        );
        assert_eq!(
            registry.skill_dir_for("old-skill").unwrap(),
            paths.legacy_skills_dir.join("old-skill")
        );
    }

    #[test]
    fn test_later_cell_wins_name_collision() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        make_dirs(&paths, DEFAULT_HUB, "first", &["shared"]);
        make_dirs(&paths, DEFAULT_HUB, "second", &["shared"]);
        write_config(
            &paths,
            DEFAULT_HUB,
            json!({
                "context_cells": [
                    {"folder": "first", "skills": {"shared": {}}},
                    {"folder": "second", "workflows": {"shared": {}}}
                ]
            }),
        );

        let registry = Registry::new(paths.clone());
        assert_eq!(names(&registry.enabled_entries()), vec!["shared", "shared"]);
        assert_eq!(
            registry.skill_dir_for("shared").unwrap(),
            paths.hub_root(DEFAULT_HUB).join("contexts/second/shared")
        );
    }

    #[test]
    fn test_lookup_is_case_sensitive_and_reports_available() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        make_dirs(&paths, DEFAULT_HUB, "dev", &["rust", "go"]);
        write_config(
            &paths,
            DEFAULT_HUB,
            json!({"context_cells": [{"folder": "dev", "skills": {"rust": {}, "go": {}}}]}),
        );

        let registry = Registry::new(paths);
        match registry.skill_dir_for("Rust") {
            Err(SkillHubError::NotFound { name, available }) => {
                assert_eq!(name, "Rust");
                assert_eq!(available, vec!["go".to_string(), "rust".to_string()]);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_hub_status_counts() {
        let temp = TempDir::new().unwrap();
        let paths = HubPaths::with_root(temp.path());
        write_selector(&paths, "Work");
        make_dirs(&paths, "Work", "dev", &["rust", "ship"]);
        write_config(
            &paths,
            "Work",
            json!({
                "context_cells": [
                    {"folder": "dev", "skills": {"rust": {}}, "workflows": {"ship": {}}},
                    {"folder": "other", "enabled": false}
                ]
            }),
        );

        let status = Registry::new(paths).hub_status();
        assert_eq!(status.active_hub, "Work");
        assert_eq!(status.context_cells, 2);
        assert_eq!(status.enabled_cells, 1);
        assert_eq!(status.skills, 1);
        assert_eq!(status.workflows, 1);
    }
}
