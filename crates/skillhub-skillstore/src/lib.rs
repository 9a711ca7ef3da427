//! Skill Store
//!
//! Assembles the text context of skills resolved by the registry.
//! A skill folder contains:
//! - skill.md / SKILL.md (primary instructions, frontmatter stripped on load)
//! - description.md (legacy metadata, never loaded)
//! - any other files and subfolders (reference material)
//!
//! Assembly order is fixed so the output is stable across runs:
//! 1. primary file body
//! 2. other root-level files, sorted by name
//! 3. files in subfolders, subfolders sorted, files sorted by path
//!
//! One unreadable file never blocks the rest of a skill: it is replaced by a
//! visible placeholder.

pub mod classify;
pub mod frontmatter;

use classify::ContentClass;
use frontmatter::{read_description, strip_frontmatter};
use skillhub_core::{
    LoadMode, Result, SkillHubError, SkillSummary, LEGACY_METADATA_FILE, PRIMARY_FILE,
    PRIMARY_FILE_UPPER,
};
use skillhub_registry::{normalize_skill_name, Registry};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Returned instead of the contents of the legacy metadata file
pub const LEGACY_FILE_REJECTION: &str = "Error: description.md is a legacy metadata file and cannot be loaded directly. Description is now in skill.md frontmatter.";

/// Returned by the default bundle when no skill is always loaded
pub const NO_ALWAYS_LOADED: &str = "No always_loaded skills configured.";

const ROOT_FILES_HEADING: &str = "\n# --- Additional Root Files ---\n";
const SUBFOLDER_HEADING: &str = "\n# --- Subfolder Resources ---\n";

/// Rendered primary file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimarySection {
    /// File name and body with the frontmatter removed
    Body { file_name: String, body: String },
    Missing,
    Unreadable { file_name: String, reason: String },
}

impl PrimarySection {
    fn load(primary: Option<&Path>) -> Self {
        let Some(path) = primary else {
            return PrimarySection::Missing;
        };
        let file_name = file_name_of(path);

        match std::fs::read_to_string(path) {
            Ok(content) => PrimarySection::Body {
                file_name,
                body: strip_frontmatter(&content),
            },
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                PrimarySection::Unreadable {
                    file_name,
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn render(&self) -> String {
        match self {
            PrimarySection::Body { file_name, body } => {
                format!("# Main Skill File: {}\n\n{}\n", file_name, body)
            }
            PrimarySection::Missing => format!("# Main Skill File: {} (Missing)\n", PRIMARY_FILE),
            PrimarySection::Unreadable { file_name, .. } => {
                format!("# Main Skill File: {} (Error reading)\n", file_name)
            }
        }
    }
}

/// Rendered reference file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSection {
    Text { relative: String, content: String },
    Binary { relative: String },
    Unreadable { relative: String, reason: String },
}

impl FileSection {
    /// Read `path` and label it relative to `skill_dir`
    pub fn load(path: &Path, skill_dir: &Path) -> Self {
        let relative = relative_posix(path, skill_dir);

        if classify::classify(path) == ContentClass::Binary {
            return FileSection::Binary { relative };
        }

        match std::fs::read_to_string(path) {
            Ok(content) => FileSection::Text { relative, content },
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                FileSection::Unreadable {
                    relative,
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn relative(&self) -> &str {
        match self {
            FileSection::Text { relative, .. }
            | FileSection::Binary { relative }
            | FileSection::Unreadable { relative, .. } => relative,
        }
    }

    pub fn render(&self) -> String {
        match self {
            FileSection::Text { relative, content } => {
                format!("### File: {}\n\n{}\n", relative, content)
            }
            FileSection::Binary { relative } => format!(
                "### Binary/Non-Text File: {}\n[Non-text file. View manually if needed.]\n",
                relative
            ),
            FileSection::Unreadable { relative, .. } => {
                format!("### File: {} (Error reading)\n", relative)
            }
        }
    }
}

/// Files of one skill folder in assembly order
#[derive(Debug, Clone, Default)]
struct SkillLayout {
    primary: Option<PathBuf>,
    root_files: Vec<PathBuf>,
    subdirs: Vec<PathBuf>,
}

impl SkillLayout {
    fn scan(skill_dir: &Path) -> Result<Self> {
        let mut layout = SkillLayout {
            primary: [PRIMARY_FILE, PRIMARY_FILE_UPPER]
                .iter()
                .map(|name| skill_dir.join(name))
                .find(|path| path.is_file()),
            ..Default::default()
        };

        for entry in std::fs::read_dir(skill_dir)?.flatten() {
            let path = entry.path();
            if path.is_dir() {
                layout.subdirs.push(path);
            } else if path.is_file() && !is_reserved_root_file(&path) {
                layout.root_files.push(path);
            }
        }

        layout.root_files.sort();
        layout.subdirs.sort();
        Ok(layout)
    }

    /// Files under each subfolder, recursively
    fn subfolder_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for subdir in &self.subdirs {
            let mut nested = Vec::new();
            collect_files(subdir, &mut nested);
            nested.sort();
            files.extend(nested.into_iter().filter(|path| !is_legacy_metadata(path)));
        }
        files
    }
}

/// Skill store manager
pub struct SkillStore {
    registry: Arc<Registry>,
}

impl SkillStore {
    pub fn new(registry: Arc<Registry>) -> Self {
        SkillStore { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Enabled skills with their descriptions, sorted by name
    pub fn list_descriptors(&self) -> Vec<SkillSummary> {
        let mut items: Vec<SkillSummary> = self
            .registry
            .enabled_entries()
            .into_iter()
            .map(|entry| SkillSummary {
                description: read_description(&entry.path).to_string(),
                name: entry.name,
                mode: entry.mode,
                kind: entry.kind,
            })
            .collect();

        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    /// Full context of one skill
    pub fn assemble_one(&self, name: &str) -> Result<String> {
        let skill_dir = self.registry.skill_dir_for(name)?;
        let name = normalize_skill_name(name)?;
        let document = render_skill(&name, &skill_dir)?;
        info!("Assembled context for skill: {}", name);
        Ok(document)
    }

    /// Contexts of every always-loaded skill, separated by blank lines
    pub fn assemble_always_loaded(&self) -> String {
        let always_loaded: Vec<_> = self
            .registry
            .enabled_entries()
            .into_iter()
            .filter(|entry| entry.mode == LoadMode::AlwaysLoaded)
            .collect();

        if always_loaded.is_empty() {
            return NO_ALWAYS_LOADED.to_string();
        }

        let documents: Vec<String> = always_loaded
            .iter()
            .filter_map(|entry| match render_skill(&entry.name, &entry.path) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!("Skipping skill {}: {}", entry.name, e);
                    None
                }
            })
            .collect();

        info!("Assembled {} always-loaded skills", documents.len());
        documents.join("\n\n")
    }

    /// Relative paths of a skill's files in assembly order, legacy metadata
    /// excluded
    pub fn list_files(&self, name: &str) -> Result<Vec<String>> {
        let skill_dir = self.registry.skill_dir_for(name)?;
        let layout = SkillLayout::scan(&skill_dir)?;

        let files = layout
            .primary
            .iter()
            .chain(layout.root_files.iter())
            .cloned()
            .chain(layout.subfolder_files())
            .map(|path| relative_posix(&path, &skill_dir))
            .collect();
        Ok(files)
    }

    /// Content of a single file inside a skill
    pub fn read_one_file(&self, name: &str, relative_path: &str) -> Result<String> {
        let skill_dir = self.registry.skill_dir_for(name)?;

        if !stays_inside(relative_path) {
            return Err(SkillHubError::PathEscape(relative_path.to_string()));
        }

        let skill_dir = skill_dir.canonicalize()?;
        let resolved = skill_dir
            .join(relative_path)
            .canonicalize()
            .map_err(|_| SkillHubError::FileNotFound(relative_path.to_string()))?;

        // Component-wise: a sibling sharing a name prefix is not contained
        if !resolved.starts_with(&skill_dir) {
            warn!("Rejected path outside skill directory: {}", relative_path);
            return Err(SkillHubError::PathEscape(relative_path.to_string()));
        }

        if !resolved.is_file() {
            return Err(SkillHubError::FileNotFound(relative_path.to_string()));
        }

        if is_legacy_metadata(&resolved) {
            return Ok(LEGACY_FILE_REJECTION.to_string());
        }

        let relative = relative_posix(&resolved, &skill_dir);
        if is_primary_file(&resolved) {
            debug!("Loading primary file with frontmatter stripped: {}", relative);
            return Ok(match std::fs::read_to_string(&resolved) {
                Ok(content) => format!("### File: {}\n\n{}\n", relative, strip_frontmatter(&content)),
                Err(e) => {
                    warn!("Failed to read {}: {}", resolved.display(), e);
                    format!("### File: {} (Error reading)\n", relative)
                }
            });
        }

        Ok(FileSection::load(&resolved, &skill_dir).render())
    }
}

/// Build the wrapped document for one skill folder
fn render_skill(name: &str, skill_dir: &Path) -> Result<String> {
    let layout = SkillLayout::scan(skill_dir)?;
    let mut parts = vec![format!("<<START skill {}>>\n", name)];

    parts.push(PrimarySection::load(layout.primary.as_deref()).render());

    if !layout.root_files.is_empty() {
        parts.push(ROOT_FILES_HEADING.to_string());
        for path in &layout.root_files {
            parts.push(FileSection::load(path, skill_dir).render());
        }
    }

    if !layout.subdirs.is_empty() {
        parts.push(SUBFOLDER_HEADING.to_string());
        for path in layout.subfolder_files() {
            parts.push(FileSection::load(&path, skill_dir).render());
        }
    }

    parts.push(format!("<<END skill {}>>", name));
    Ok(parts.join("\n"))
}

/// Recursively collect regular files. Symlinked directories are not followed.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => collect_files(&path, files),
            Ok(_) if path.is_file() => files.push(path),
            _ => {}
        }
    }
}

/// Reject absolute paths and `..` that climbs above the skill directory
fn stays_inside(relative_path: &str) -> bool {
    let mut depth: usize = 0;
    for component in Path::new(relative_path).components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn lower_file_name(path: &Path) -> String {
    file_name_of(path).to_lowercase()
}

fn is_primary_file(path: &Path) -> bool {
    lower_file_name(path) == PRIMARY_FILE
}

fn is_legacy_metadata(path: &Path) -> bool {
    lower_file_name(path) == LEGACY_METADATA_FILE
}

fn is_reserved_root_file(path: &Path) -> bool {
    is_primary_file(path) || is_legacy_metadata(path)
}

/// `/`-separated path of `path` relative to `root`
fn relative_posix(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skillhub_core::DEFAULT_HUB;
    use skillhub_registry::paths::HubPaths;
    use tempfile::TempDir;

    struct Hub {
        _temp: TempDir,
        paths: HubPaths,
        store: SkillStore,
    }

    impl Hub {
        fn new(config: serde_json::Value) -> Self {
            let temp = TempDir::new().unwrap();
            let paths = HubPaths::with_root(temp.path());
            let root = paths.hub_root(DEFAULT_HUB);
            std::fs::create_dir_all(&root).unwrap();
            std::fs::write(root.join("config.json"), config.to_string()).unwrap();
            let store = SkillStore::new(Arc::new(Registry::new(paths.clone())));
            Hub {
                _temp: temp,
                paths,
                store,
            }
        }

        fn skill_dir(&self, folder: &str, name: &str) -> PathBuf {
            let dir = self
                .paths
                .hub_root(DEFAULT_HUB)
                .join("contexts")
                .join(folder)
                .join(name);
            std::fs::create_dir_all(&dir).unwrap();
            dir
        }
    }

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_stays_inside() {
        assert!(stays_inside("notes.md"));
        assert!(stays_inside("refs/../notes.md"));
        assert!(stays_inside("./refs/a.md"));
        assert!(!stays_inside("../x"));
        assert!(!stays_inside("a/../../b"));
        assert!(!stays_inside("/etc/passwd"));
    }

    #[test]
    fn test_primary_section_variants() {
        let temp = TempDir::new().unwrap();
        assert_eq!(PrimarySection::load(None), PrimarySection::Missing);
        assert_eq!(
            PrimarySection::Missing.render(),
            "# Main Skill File: skill.md (Missing)\n"
        );

        let path = temp.path().join("skill.md");
        std::fs::write(&path, "---\ndescription: x\n---\nBody").unwrap();
        assert_eq!(
            PrimarySection::load(Some(&path)),
            PrimarySection::Body {
                file_name: "skill.md".to_string(),
                body: "Body".to_string()
            }
        );

        std::fs::write(&path, [0xff, 0xfe]).unwrap();
        assert!(matches!(
            PrimarySection::load(Some(&path)),
            PrimarySection::Unreadable { .. }
        ));
    }

    #[test]
    fn test_file_section_variants() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "refs/a.md", "alpha");
        write(temp.path(), "logo.png", "fake");

        let text = FileSection::load(&temp.path().join("refs/a.md"), temp.path());
        assert_eq!(text.relative(), "refs/a.md");
        assert_eq!(text.render(), "### File: refs/a.md\n\nalpha\n");

        let binary = FileSection::load(&temp.path().join("logo.png"), temp.path());
        assert_eq!(
            binary,
            FileSection::Binary {
                relative: "logo.png".to_string()
            }
        );
        assert!(binary.render().starts_with("### Binary/Non-Text File: logo.png\n"));
    }

    #[test]
    fn test_list_files_order() {
        let hub = Hub::new(json!({"context_cells": [{"folder": "dev", "skills": {"s": {}}}]}));
        let dir = hub.skill_dir("dev", "s");
        write(&dir, "skill.md", "---\ndescription: d\n---\nbody");
        write(&dir, "b.md", "b");
        write(&dir, "a.md", "a");
        write(&dir, "description.md", "legacy");
        write(&dir, "z/c.md", "c");
        write(&dir, "refs/deep/x.md", "x");
        write(&dir, "refs/description.md", "legacy");

        assert_eq!(
            hub.store.list_files("s").unwrap(),
            vec!["skill.md", "a.md", "b.md", "refs/deep/x.md", "z/c.md"]
        );
    }

    #[test]
    fn test_always_loaded_empty() {
        let hub = Hub::new(json!({"context_cells": [{"folder": "dev", "skills": {"s": {"mode": "dynamic"}}}]}));
        hub.skill_dir("dev", "s");
        assert_eq!(hub.store.assemble_always_loaded(), NO_ALWAYS_LOADED);
    }

    #[test]
    fn test_read_one_file_rejects_sibling_prefix() {
        let hub = Hub::new(json!({"context_cells": [{"folder": "dev", "skills": {"s": {}}}]}));
        let dir = hub.skill_dir("dev", "s");
        let sibling = hub.skill_dir("dev", "s-private");
        write(&dir, "a.md", "a");
        write(&sibling, "secret.md", "secret");

        assert!(matches!(
            hub.store.read_one_file("s", "../s-private/secret.md"),
            Err(SkillHubError::PathEscape(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_one_file_rejects_symlink_escape() {
        let hub = Hub::new(json!({"context_cells": [{"folder": "dev", "skills": {"s": {}}}]}));
        let dir = hub.skill_dir("dev", "s");
        let outside = hub.skill_dir("dev", "other");
        write(&outside, "secret.md", "secret");
        std::os::unix::fs::symlink(outside.join("secret.md"), dir.join("link.md")).unwrap();

        assert!(matches!(
            hub.store.read_one_file("s", "link.md"),
            Err(SkillHubError::PathEscape(_))
        ));
    }
}
