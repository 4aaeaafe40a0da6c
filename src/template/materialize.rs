//! On-disk materialization of template trees.
//!
//! The materializer walks a [`TemplateNode`] depth-first and reproduces it
//! under a destination directory, resolving fragment references and
//! substituting `{{Var}}` placeholders along the way.
//!
//! Directory creation is idempotent, so materializing the same tree twice
//! into the same destination overwrites files rather than failing. A write
//! failure aborts the whole pass with the failing path; output already on
//! disk is left in place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, instrument, warn};

use super::store::FragmentSource;
use super::tree::{parse_fragment_ref, substitute, Bindings, TemplateNode};
use crate::error::MaterializeError;

/// Summary of one materialization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializeReport {
    /// Paths of all files written, in write order.
    pub files_written: Vec<PathBuf>,
    /// Number of directories ensured to exist (including pre-existing ones).
    pub dirs_created: usize,
}

/// Writes template trees to disk with substitution applied.
pub struct Materializer<S: FragmentSource> {
    store: Arc<S>,
}

impl<S: FragmentSource> Materializer<S> {
    /// Creates a materializer resolving fragment references against `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Materializes `tree` under `dest`.
    ///
    /// The root node must be a directory. Returns a report of what was
    /// written; on failure the error names the path that could not be
    /// written and any partial output remains on disk.
    #[instrument(skip_all, fields(dest = %dest.display()))]
    pub async fn materialize(
        &self,
        tree: &TemplateNode,
        dest: &Path,
        bindings: &Bindings,
    ) -> Result<MaterializeReport, MaterializeError> {
        let TemplateNode::Dir(entries) = tree else {
            return Err(MaterializeError::InvalidRoot);
        };

        let mut report = MaterializeReport::default();
        let mut stack: Vec<(PathBuf, &BTreeMap<String, TemplateNode>)> =
            vec![(dest.to_path_buf(), entries)];

        while let Some((dir, entries)) = stack.pop() {
            fs::create_dir_all(&dir)
                .await
                .map_err(|source| MaterializeError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
            report.dirs_created += 1;

            for (name, node) in entries {
                let path = dir.join(name);
                match node {
                    TemplateNode::Empty => {
                        self.write_file(&path, "", &mut report).await?;
                    }
                    TemplateNode::File(raw) => {
                        let effective = self.effective_content(raw);
                        let rendered = substitute(&effective, bindings);
                        self.write_file(&path, &rendered, &mut report).await?;
                    }
                    TemplateNode::Dir(children) => {
                        stack.push((path, children));
                    }
                }
            }
        }

        debug!(
            files = report.files_written.len(),
            dirs = report.dirs_created,
            "materialized template tree"
        );
        Ok(report)
    }

    /// Resolves a whole-string fragment reference, falling back to the
    /// literal content when the lookup fails.
    fn effective_content(&self, raw: &str) -> String {
        let Some((category, name)) = parse_fragment_ref(raw) else {
            return raw.to_string();
        };

        match self.store.fragment(category, name) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    category,
                    name,
                    error = %err,
                    "fragment lookup failed, keeping literal content"
                );
                raw.to_string()
            }
        }
    }

    async fn write_file(
        &self,
        path: &Path,
        content: &str,
        report: &mut MaterializeReport,
    ) -> Result<(), MaterializeError> {
        fs::write(path, content)
            .await
            .map_err(|source| MaterializeError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        report.files_written.push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::store::MemoryFragmentStore;
    use tempfile::tempdir;

    fn materializer_with(store: MemoryFragmentStore) -> Materializer<MemoryFragmentStore> {
        Materializer::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_materialize_nested_tree_with_substitution() {
        let tree = TemplateNode::dir([(
            "a",
            TemplateNode::dir([("b.txt", TemplateNode::file("Hello {{Name}}"))]),
        )]);
        let bindings = Bindings::new().with("Name", "World");
        let dest = tempdir().expect("failed to create temp dir");

        let report = materializer_with(MemoryFragmentStore::new())
            .materialize(&tree, dest.path(), &bindings)
            .await
            .expect("materialization should succeed");

        let content = std::fs::read_to_string(dest.path().join("a/b.txt")).expect("read output");
        assert_eq!(content, "Hello World");
        assert_eq!(report.files_written.len(), 1);
    }

    #[tokio::test]
    async fn test_materialize_empty_file_node() {
        let tree = TemplateNode::dir([(".gitkeep", TemplateNode::Empty)]);
        let dest = tempdir().expect("failed to create temp dir");

        materializer_with(MemoryFragmentStore::new())
            .materialize(&tree, dest.path(), &Bindings::new())
            .await
            .expect("materialization should succeed");

        let content = std::fs::read_to_string(dest.path().join(".gitkeep")).expect("read output");
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn test_materialize_twice_is_idempotent() {
        let tree = TemplateNode::dir([(
            "src",
            TemplateNode::dir([("main.txt", TemplateNode::file("v {{Version}}"))]),
        )]);
        let dest = tempdir().expect("failed to create temp dir");
        let materializer = materializer_with(MemoryFragmentStore::new());

        materializer
            .materialize(&tree, dest.path(), &Bindings::new().with("Version", "1"))
            .await
            .expect("first pass should succeed");
        materializer
            .materialize(&tree, dest.path(), &Bindings::new().with("Version", "2"))
            .await
            .expect("second pass should succeed despite existing directories");

        let content =
            std::fs::read_to_string(dest.path().join("src/main.txt")).expect("read output");
        assert_eq!(content, "v 2", "second pass overwrites files");
    }

    #[tokio::test]
    async fn test_fragment_resolution() {
        let mut store = MemoryFragmentStore::new();
        store.insert("contracts", "erc20", "contract {{ProjectName}} {}");
        let tree = TemplateNode::dir([("Token.sol", TemplateNode::file("{{contracts.erc20}}"))]);
        let dest = tempdir().expect("failed to create temp dir");

        materializer_with(store)
            .materialize(
                &tree,
                dest.path(),
                &Bindings::new().with("ProjectName", "Demo"),
            )
            .await
            .expect("materialization should succeed");

        let content = std::fs::read_to_string(dest.path().join("Token.sol")).expect("read output");
        assert_eq!(content, "contract Demo {}");
    }

    #[tokio::test]
    async fn test_fragment_fallback_to_literal() {
        let tree = TemplateNode::dir([("frag.txt", TemplateNode::file("{{missing.frag}}"))]);
        let dest = tempdir().expect("failed to create temp dir");

        materializer_with(MemoryFragmentStore::new())
            .materialize(&tree, dest.path(), &Bindings::new())
            .await
            .expect("lookup failure must not abort materialization");

        let content = std::fs::read_to_string(dest.path().join("frag.txt")).expect("read output");
        assert_eq!(content, "{{missing.frag}}");
    }

    #[tokio::test]
    async fn test_non_directory_root_rejected() {
        let tree = TemplateNode::file("not a tree");
        let dest = tempdir().expect("failed to create temp dir");

        let result = materializer_with(MemoryFragmentStore::new())
            .materialize(&tree, dest.path(), &Bindings::new())
            .await;
        assert!(matches!(result, Err(MaterializeError::InvalidRoot)));
    }

    #[tokio::test]
    async fn test_write_failure_carries_path() {
        let tree = TemplateNode::dir([("file.txt", TemplateNode::file("x"))]);
        let dest = tempdir().expect("failed to create temp dir");
        // A file standing where a directory is needed forces the failure.
        let blocked = dest.path().join("blocked");
        std::fs::write(&blocked, "").expect("write blocker");

        let result = materializer_with(MemoryFragmentStore::new())
            .materialize(&tree, &blocked, &Bindings::new())
            .await;

        match result {
            Err(MaterializeError::CreateDir { path, .. }) => assert_eq!(path, blocked),
            other => panic!("expected CreateDir error, got {:?}", other),
        }
    }
}
