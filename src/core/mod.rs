//! Core Data Model
//!
//! Open documents and the diagnostics attached to them.

pub mod diagnostics;
pub mod document;

pub use diagnostics::{Diagnostic, DiagnosticSource, Severity, TextRange};
pub use document::{DocumentError, DocumentStore, Snapshot};
