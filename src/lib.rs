//! chainforge: AI-assisted blockchain project scaffolding.
//!
//! This library turns a short project description and a target blockchain
//! into a project skeleton on disk: it materializes file-tree templates with
//! variable substitution, dispatches prompts to a text-generation API with
//! bounded retry, and recommends cross-chain bridge protocols for
//! multi-chain projects.

// Core modules
pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod scaffold;
pub mod template;
pub mod utils;

// Re-export commonly used error types
pub use error::{LlmError, MaterializeError, ParseError, ScaffoldError, StoreError};
