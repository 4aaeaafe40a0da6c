//! Template tree and variable binding types.
//!
//! A template tree is a recursively nested mapping from path-segment name to
//! either an empty file, file content, or a subdirectory. File content may
//! contain `{{Var}}` placeholders or a whole-string `{{category.name}}`
//! fragment reference resolved against a [`FragmentSource`].
//!
//! [`FragmentSource`]: super::FragmentSource

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of a derived token symbol.
const TOKEN_SYMBOL_MAX_LEN: usize = 5;

/// Placeholder symbol used when a project name yields no usable characters.
const TOKEN_SYMBOL_FALLBACK: &str = "TKN";

/// Matches a single `{{VarName}}` placeholder occurrence.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([A-Za-z_][A-Za-z0-9_]*)\}\}").expect("placeholder regex is valid")
});

/// Matches content that consists solely of a `{{category.name}}` reference.
static FRAGMENT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{([A-Za-z][A-Za-z0-9_-]*)\.([A-Za-z0-9][A-Za-z0-9_.-]*)\}\}$")
        .expect("fragment reference regex is valid")
});

/// One node of a template tree.
///
/// Deserializes from plain JSON: `null` is an empty file, a string is file
/// content, an object is a subdirectory. Cycles are impossible because nodes
/// own their children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateNode {
    /// An empty file.
    Empty,
    /// A file with content, possibly containing placeholders or a
    /// fragment reference.
    File(String),
    /// A subdirectory. Sibling order has no semantic effect; entries are
    /// kept in deterministic (sorted) order.
    Dir(BTreeMap<String, TemplateNode>),
}

impl TemplateNode {
    /// Creates a file node from content.
    pub fn file(content: impl Into<String>) -> Self {
        TemplateNode::File(content.into())
    }

    /// Creates a directory node from an iterator of named children.
    pub fn dir<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, TemplateNode)>,
        K: Into<String>,
    {
        TemplateNode::Dir(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns true if this node is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, TemplateNode::Dir(_))
    }

    /// Total number of file nodes (empty or not) in this subtree.
    pub fn file_count(&self) -> usize {
        match self {
            TemplateNode::Empty | TemplateNode::File(_) => 1,
            TemplateNode::Dir(entries) => entries.values().map(TemplateNode::file_count).sum(),
        }
    }
}

/// Flat placeholder-name to value mapping used for substitution.
///
/// Built fresh per scaffolding request from user-supplied project fields
/// plus computed defaults, and immutable during a materialization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    /// Creates an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the standard bindings for a project: `ProjectName`,
    /// `TokenSymbol` (derived from the name), `Blockchain` and `Network`.
    pub fn for_project(project_name: &str, blockchain: &str, network: &str) -> Self {
        Self::new()
            .with("ProjectName", project_name)
            .with("TokenSymbol", derive_token_symbol(project_name))
            .with("Blockchain", blockchain)
            .with("Network", network)
    }

    /// Adds a binding, replacing any previous value for the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Sets a binding in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Looks up a binding value by placeholder name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no bindings are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Derives a token symbol from a project name.
///
/// Keeps ASCII alphanumeric characters, uppercased, truncated to five; falls
/// back to `TKN` for names with no usable characters.
pub fn derive_token_symbol(project_name: &str) -> String {
    let symbol: String = project_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(TOKEN_SYMBOL_MAX_LEN)
        .collect::<String>()
        .to_ascii_uppercase();

    if symbol.is_empty() {
        TOKEN_SYMBOL_FALLBACK.to_string()
    } else {
        symbol
    }
}

/// Substitutes every `{{VarName}}` occurrence in `content` using `bindings`.
///
/// Unmatched placeholders are left verbatim so that missing-variable bugs
/// surface in the output instead of silently producing blanks.
pub fn substitute(content: &str, bindings: &Bindings) -> String {
    PLACEHOLDER
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match bindings.get(name) {
                Some(value) => value.to_string(),
                None => {
                    tracing::debug!(placeholder = name, "no binding for placeholder, kept verbatim");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Parses a whole-string `{{category.name}}` fragment reference.
///
/// Returns `(category, name)` when the entire trimmed content is a single
/// reference, `None` otherwise.
pub fn parse_fragment_ref(content: &str) -> Option<(&str, &str)> {
    let caps = FRAGMENT_REF.captures(content.trim())?;
    Some((
        caps.get(1).expect("group 1 always present").as_str(),
        caps.get(2).expect("group 2 always present").as_str(),
    ))
}
