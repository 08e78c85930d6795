//! Diagnostic Model
//!
//! Located, severity-tagged issue reports, independent of the protocol types.

use tower_lsp::lsp_types::{self, DiagnosticSeverity, Position, Range};

/// Which collaborator produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSource {
    Lint,
    Validate,
}

impl DiagnosticSource {
    /// Tag shown to the user next to the message
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticSource::Lint => "cylc lint",
            DiagnosticSource::Validate => "cylc validate",
        }
    }
}

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Half-open `[start, end)` span; lines and columns are 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl TextRange {
    pub fn on_line(line: u32, start_col: u32, end_col: u32) -> Self {
        Self {
            start_line: line,
            start_col,
            end_line: line,
            end_col: end_col.max(start_col),
        }
    }
}

/// A diagnostic attached to one document
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub source: DiagnosticSource,
    pub severity: Severity,
    pub range: TextRange,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        source: DiagnosticSource,
        severity: Severity,
        range: TextRange,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            severity,
            range,
            message: message.into(),
        }
    }

    /// Convert into the wire representation
    pub fn to_lsp(&self) -> lsp_types::Diagnostic {
        let severity = match self.severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
            Severity::Info => DiagnosticSeverity::INFORMATION,
        };

        lsp_types::Diagnostic::new(
            Range::new(
                Position::new(self.range.start_line, self.range.start_col),
                Position::new(self.range.end_line, self.range.end_col),
            ),
            Some(severity),
            None,
            Some(self.source.label().to_string()),
            self.message.clone(),
            None,
            None,
        )
    }
}
