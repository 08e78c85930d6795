//! Cylc Language Server
//!
//! A Language Server Protocol implementation for Cylc workflow
//! configurations (`flow.cylc`).
//!
//! This library provides:
//! - Style linting and external `cylc validate` diagnostics
//! - Completions from the workflow configuration specification
//! - Validate/lint code actions and dynamic capability registration
//! - Configuration management

pub mod config;
pub mod core;
pub mod lint;
pub mod lsp;
pub mod spec;
pub mod validation;

// Re-exports for clean public API
pub use config::Config;
pub use core::{Diagnostic, DocumentStore};
pub use lint::{lint_text, StyleLinter};
pub use spec::{CompletionProvider, SpecTree};
pub use validation::{Aggregator, ValidationMode};
