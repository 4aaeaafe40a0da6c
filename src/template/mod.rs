//! Template system for chainforge project scaffolding.
//!
//! A template is a nested file-tree description with `{{Var}}` placeholders
//! and `{{category.name}}` fragment references. This module provides the
//! tree and binding types, the fragment store and template registry, the
//! on-disk materializer, and a strict parser for free-text structure
//! listings.
//!
//! # Example
//!
//! ```no_run
//! use chainforge::template::{
//!     Bindings, Materializer, MemoryFragmentStore, TemplateNode,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), chainforge::MaterializeError> {
//! let tree = TemplateNode::dir([(
//!     "contracts",
//!     TemplateNode::dir([("Token.sol", TemplateNode::file("// {{ProjectName}}"))]),
//! )]);
//!
//! let materializer = Materializer::new(Arc::new(MemoryFragmentStore::new()));
//! let bindings = Bindings::for_project("Demo", "ethereum", "sepolia");
//! materializer
//!     .materialize(&tree, "./demo".as_ref(), &bindings)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod materialize;
pub mod parse;
pub mod store;
pub mod tree;

pub use materialize::{MaterializeReport, Materializer};
pub use parse::parse_structure;
pub use store::{
    DirFragmentStore, FragmentSource, MemoryFragmentStore, ProjectTemplate, TemplateRegistry,
    FRAGMENT_CATEGORIES,
};
pub use tree::{derive_token_symbol, parse_fragment_ref, substitute, Bindings, TemplateNode};
