//! Shared utilities.

pub mod code_extraction;

pub use code_extraction::{extract_code_blocks, extract_code_or_raw, CodeBlock};
