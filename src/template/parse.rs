//! Parsing of free-text project-structure listings.
//!
//! Generation output often describes a file tree as an indented listing.
//! Turning that text into a [`TemplateNode`] is a best-effort, clearly
//! fallible operation: indentation that does not follow a consistent step is
//! rejected with a typed [`ParseError`] instead of guessing intent.
//!
//! Parsed entries carry no file content, so file nodes come back as
//! [`TemplateNode::Empty`].

use std::collections::BTreeMap;

use super::tree::TemplateNode;
use crate::error::ParseError;

/// One parsed listing entry: nesting depth, name, explicit-directory marker.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    depth: usize,
    name: String,
    is_dir: bool,
}

/// Parses an indented file-tree listing into a template tree.
///
/// Rules:
/// - indentation is spaces only; the first indented line fixes the step
/// - every indent must be a multiple of the step
/// - an entry may nest at most one level below its predecessor
/// - a trailing `/` marks a directory; entries with children are directories
///   regardless
///
/// ```
/// use chainforge::template::parse_structure;
///
/// let tree = parse_structure("src/\n  lib.rs\nREADME.md\n").expect("valid listing");
/// assert_eq!(tree.file_count(), 2);
/// ```
pub fn parse_structure(text: &str) -> Result<TemplateNode, ParseError> {
    let entries = collect_entries(text)?;
    if entries.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut pos = 0;
    let root = build_level(&entries, &mut pos, 0);
    Ok(TemplateNode::Dir(root))
}

fn collect_entries(text: &str) -> Result<Vec<Entry>, ParseError> {
    let mut entries: Vec<Entry> = Vec::new();
    let mut step: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let indent = raw.len() - raw.trim_start_matches(' ').len();
        // Tabs in the indentation column are ambiguous; reject them.
        if raw[indent..].starts_with('\t') {
            return Err(ParseError::InconsistentIndent { line });
        }

        let mut name = raw.trim().to_string();
        for bullet in ["- ", "* "] {
            if let Some(stripped) = name.strip_prefix(bullet) {
                name = stripped.trim_start().to_string();
                break;
            }
        }
        if name.is_empty() {
            continue;
        }

        let depth = match (indent, step) {
            (0, _) => 0,
            (n, None) => {
                step = Some(n);
                1
            }
            (n, Some(s)) => {
                if n % s != 0 {
                    return Err(ParseError::InconsistentIndent { line });
                }
                n / s
            }
        };

        let prev_depth = entries.last().map(|e| e.depth as isize).unwrap_or(-1);
        if depth as isize > prev_depth + 1 {
            return Err(ParseError::IndentJump { line });
        }

        let is_dir = name.ends_with('/');
        let name = name.trim_end_matches('/').to_string();
        entries.push(Entry {
            depth,
            name,
            is_dir,
        });
    }

    Ok(entries)
}

fn build_level(
    entries: &[Entry],
    pos: &mut usize,
    depth: usize,
) -> BTreeMap<String, TemplateNode> {
    let mut level = BTreeMap::new();

    while *pos < entries.len() {
        let entry = &entries[*pos];
        if entry.depth < depth {
            break;
        }
        *pos += 1;

        let has_children = entries.get(*pos).is_some_and(|next| next.depth > entry.depth);
        let node = if entry.is_dir || has_children {
            TemplateNode::Dir(build_level(entries, pos, entry.depth + 1))
        } else {
            TemplateNode::Empty
        };
        level.insert(entry.name.clone(), node);
    }

    level
}
