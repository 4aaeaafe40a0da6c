//! Error types for chainforge operations.
//!
//! Defines error types for the major subsystems:
//! - Template materialization (filesystem writes)
//! - Fragment store and template registry lookups
//! - LLM API interactions and retry exhaustion
//! - Free-text project-structure parsing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while materializing a template tree to disk.
///
/// Materialization failures are fatal to the current request and are not
/// retried. Partial output already written to disk is not rolled back.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Failed to write file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template root must be a directory node")]
    InvalidRoot,
}

/// Errors that can occur in the fragment store or template registry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Fragment '{category}/{name}' not found")]
    FragmentNotFound { category: String, name: String },

    #[error("Unknown fragment category '{0}'")]
    UnknownCategory(String),

    #[error("Template '{0}' already registered for its project type and chain")]
    DuplicateTemplate(String),

    #[error("Failed to parse template file '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API base URL: CHAINFORGE_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Generation call succeeded but returned no usable content")]
    EmptyResponse,

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<LlmError>,
    },
}

/// Errors that can occur while parsing free-text project structure output.
///
/// Structure parsing is best-effort by design: callers treat any of these as
/// "no usable structure" rather than guessing intent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Structure text contains no entries")]
    EmptyInput,

    #[error("Line {line}: indentation is not a multiple of the detected step")]
    InconsistentIndent { line: usize },

    #[error("Line {line}: entry is nested more than one level below its parent")]
    IndentJump { line: usize },
}

/// Errors that can occur during project scaffolding.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Generation(#[from] LlmError),

    #[error("Failed to write generated source '{path}': {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
