//! Fragment store and project template registry.
//!
//! Named template fragments are looked up by `(category, name)` where the
//! category is one of a small fixed set. The file-backed store maps
//! categories to subdirectories of a root; an in-memory store backs tests.
//! Project templates (whole trees keyed by project type and chain) live in
//! the [`TemplateRegistry`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::tree::TemplateNode;
use crate::error::StoreError;

/// Fragment categories recognized by the file-backed store.
pub const FRAGMENT_CATEGORIES: &[&str] = &["contracts", "frontend", "projects"];

/// Lookup of named template fragments.
///
/// Implementations must fail with a [`StoreError`] rather than panic; the
/// materializer recovers from lookup failures by falling back to literal
/// content.
pub trait FragmentSource: Send + Sync {
    /// Returns the content of the fragment `category/name`.
    fn fragment(&self, category: &str, name: &str) -> Result<String, StoreError>;
}

/// File-backed fragment store.
///
/// Fragments are loaded eagerly from `<root>/<category>/` and cached keyed
/// by `(category, file stem)`.
#[derive(Debug, Default)]
pub struct DirFragmentStore {
    fragments: HashMap<(String, String), String>,
}

impl DirFragmentStore {
    /// Loads all fragments under the known category subdirectories of `root`.
    ///
    /// Missing category directories are skipped; unreadable files abort the
    /// load.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let mut fragments = HashMap::new();

        for category in FRAGMENT_CATEGORIES {
            let dir = root.join(category);
            if !dir.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&dir).min_depth(1).into_iter() {
                let entry = entry.map_err(|e| {
                    StoreError::Io(e.into_io_error().unwrap_or_else(|| {
                        std::io::Error::other("walkdir entry without IO cause")
                    }))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let name = entry
                    .path()
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let content = fs::read_to_string(entry.path())?;
                fragments.insert((category.to_string(), name), content);
            }
        }

        tracing::debug!(count = fragments.len(), root = %root.display(), "loaded fragment store");
        Ok(Self { fragments })
    }

    /// Returns the number of loaded fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns true if no fragments are loaded.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl FragmentSource for DirFragmentStore {
    fn fragment(&self, category: &str, name: &str) -> Result<String, StoreError> {
        if !FRAGMENT_CATEGORIES.contains(&category) {
            return Err(StoreError::UnknownCategory(category.to_string()));
        }
        self.fragments
            .get(&(category.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::FragmentNotFound {
                category: category.to_string(),
                name: name.to_string(),
            })
    }
}

/// In-memory fragment store.
#[derive(Debug, Default)]
pub struct MemoryFragmentStore {
    fragments: HashMap<(String, String), String>,
}

impl MemoryFragmentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fragment.
    pub fn insert(
        &mut self,
        category: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.fragments
            .insert((category.into(), name.into()), content.into());
    }
}

impl FragmentSource for MemoryFragmentStore {
    fn fragment(&self, category: &str, name: &str) -> Result<String, StoreError> {
        self.fragments
            .get(&(category.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::FragmentNotFound {
                category: category.to_string(),
                name: name.to_string(),
            })
    }
}

/// A complete project template: a named tree applicable to one project type
/// on one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTemplate {
    /// Template identifier (e.g. "hardhat-token").
    pub name: String,
    /// Project type this template applies to (e.g. "token", "nft").
    pub project_type: String,
    /// Blockchain identifier this template targets.
    pub chain: String,
    /// The file tree to materialize.
    pub tree: TemplateNode,
}

/// Registry of project templates keyed by `(project_type, chain)`.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: Vec<ProjectTemplate>,
    loaded_paths: HashMap<String, PathBuf>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template directly.
    ///
    /// Rejects a second template for the same `(project_type, chain)` pair.
    pub fn register(&mut self, template: ProjectTemplate) -> Result<(), StoreError> {
        if self
            .select(&template.project_type, &template.chain)
            .is_some()
        {
            return Err(StoreError::DuplicateTemplate(template.name));
        }
        self.templates.push(template);
        Ok(())
    }

    /// Loads a single template from a JSON file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<&ProjectTemplate, StoreError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let template: ProjectTemplate =
            serde_json::from_str(&content).map_err(|e| StoreError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let name = template.name.clone();
        self.register(template)?;
        self.loaded_paths.insert(name, path.to_path_buf());
        Ok(self.templates.last().expect("template was just registered"))
    }

    /// Loads all `.json` templates under a directory, recursively.
    ///
    /// Returns the number of templates loaded.
    pub fn load_directory(&mut self, dir: impl AsRef<Path>) -> Result<usize, StoreError> {
        let mut count = 0;
        for entry in WalkDir::new(dir.as_ref()).min_depth(1).into_iter() {
            let entry = entry.map_err(|e| {
                StoreError::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walkdir entry without IO cause")),
                )
            })?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json")
            {
                self.load_file(entry.path())?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Returns the template matching a project type and chain, if any.
    ///
    /// Matching is case-insensitive on both keys.
    pub fn select(&self, project_type: &str, chain: &str) -> Option<&ProjectTemplate> {
        self.templates.iter().find(|t| {
            t.project_type.eq_ignore_ascii_case(project_type) && t.chain.eq_ignore_ascii_case(chain)
        })
    }

    /// Returns the file path a template was loaded from, if it came from disk.
    pub fn source_path(&self, name: &str) -> Option<&Path> {
        self.loaded_paths.get(name).map(PathBuf::as_path)
    }

    /// Returns the number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if the registry holds no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Iterates over all registered templates.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectTemplate> {
        self.templates.iter()
    }
}
