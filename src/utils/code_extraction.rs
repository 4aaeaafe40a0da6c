//! Extraction of fenced code blocks from generation output.
//!
//! Generated text frequently wraps code in triple-backtick fences with an
//! optional language tag, surrounded by prose. Extraction never fails: when
//! no fenced block is present the raw text is returned unchanged.

/// A single fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag on the opening fence, if any (e.g. "solidity").
    pub language: Option<String>,
    /// Inner content of the block, without the fence lines.
    pub content: String,
}

/// Extracts every fenced code block from `text`, in order of appearance.
///
/// An opening fence that is never closed is treated as running to the end of
/// the input.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(Option<String>, Vec<&str>)> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();
        match current {
            None => {
                if let Some(rest) = trimmed.strip_prefix("```") {
                    let tag = rest.trim();
                    let language = if tag.is_empty() {
                        None
                    } else {
                        Some(tag.to_string())
                    };
                    current = Some((language, Vec::new()));
                }
            }
            Some((ref language, ref mut lines)) => {
                if trimmed.starts_with("```") {
                    blocks.push(CodeBlock {
                        language: language.clone(),
                        content: lines.join("\n"),
                    });
                    current = None;
                } else {
                    lines.push(line);
                }
            }
        }
    }

    // Unclosed fence: keep what was accumulated rather than dropping it.
    if let Some((language, lines)) = current {
        blocks.push(CodeBlock {
            language,
            content: lines.join("\n"),
        });
    }

    blocks
}

/// Returns the concatenated contents of all fenced code blocks in `text`,
/// or the raw text unchanged when no fenced block is found.
pub fn extract_code_or_raw(text: &str) -> String {
    let blocks = extract_code_blocks(text);
    if blocks.is_empty() {
        return text.to_string();
    }

    blocks
        .into_iter()
        .map(|b| b.content)
        .collect::<Vec<_>>()
        .join("\n")
}
