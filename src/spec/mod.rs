//! Workflow Configuration Specification
//!
//! The static key tree and the completions derived from it.

pub mod completion;
pub mod tree;

pub use completion::CompletionProvider;
pub use tree::{SpecTree, ROOT_NAME};
