//! Style Linter
//!
//! Fast, local checks run directly over the editor text on every cycle.

pub mod rules;

use thiserror::Error;

use crate::core::diagnostics::{Diagnostic, DiagnosticSource, Severity, TextRange};
use rules::{
    classify_line, indent_width, triple_quotes, LineKind, LintRule, ITEM_NOT_INDENTED,
    LINE_TOO_LONG, SECOND_LEVEL_INDENT, TAB_INDENT, THIRD_LEVEL_INDENT, TOP_LEVEL_INDENTED,
    TRAILING_WHITESPACE,
};

pub use rules::RULES;

pub const DEFAULT_MAX_LINE_LENGTH: usize = 130;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("linter failed: {0}")]
    Failed(String),
}

/// Anything that turns source text into diagnostics
pub trait Linter: Send + Sync {
    fn lint(&self, text: &str) -> Result<Vec<Diagnostic>, LintError>;
}

/// The built-in style checker
#[derive(Debug, Clone)]
pub struct StyleLinter {
    max_line_length: usize,
}

impl StyleLinter {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }
}

impl Default for StyleLinter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Linter for StyleLinter {
    fn lint(&self, text: &str) -> Result<Vec<Diagnostic>, LintError> {
        Ok(lint_text(text, self.max_line_length))
    }
}

fn warn(rule: LintRule, line: u32, start: usize, end: usize) -> Diagnostic {
    Diagnostic::new(
        DiagnosticSource::Lint,
        Severity::Warning,
        TextRange::on_line(line, start as u32, end as u32),
        rule.message(),
    )
}

/// Protocol column of the `chars`-th character of `line` (UTF-16 units)
fn utf16_col(line: &str, chars: usize) -> usize {
    line.chars().take(chars).map(char::len_utf16).sum()
}

/// Run every style rule over `text`, in line order. Line lengths are
/// counted in characters, ranges in UTF-16 code units.
pub fn lint_text(text: &str, max_line_length: usize) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut in_string = false;
    let mut section_depth = 0;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx as u32;
        let width = line.chars().count();
        let line_end = line.encode_utf16().count();
        let content_end = line.trim_end().encode_utf16().count();

        // Bodies of multi-line strings (scripts, graphs) are free-form
        let structural = !in_string;
        if triple_quotes(line) % 2 == 1 {
            in_string = !in_string;
        }

        if structural {
            let indent = indent_width(line);
            let kind = classify_line(line);

            let leading = &line[..line.len() - line.trim_start().len()];
            if leading.contains('\t') && !matches!(kind, LineKind::Blank | LineKind::Template) {
                diagnostics.push(warn(TAB_INDENT, line_no, 0, indent));
            }

            match kind {
                LineKind::Section { depth, .. } => {
                    section_depth = depth;
                    let rule = match depth {
                        1 if indent != 0 => Some(TOP_LEVEL_INDENTED),
                        2 if indent != 4 => Some(SECOND_LEVEL_INDENT),
                        3 if indent != 8 => Some(THIRD_LEVEL_INDENT),
                        _ => None,
                    };
                    if let Some(rule) = rule {
                        diagnostics.push(warn(rule, line_no, 0, content_end));
                    }
                }
                LineKind::Setting { .. } if indent == 0 && section_depth > 0 => {
                    diagnostics.push(warn(ITEM_NOT_INDENTED, line_no, 0, content_end));
                }
                _ => {}
            }
        }

        if content_end < line_end {
            diagnostics.push(warn(TRAILING_WHITESPACE, line_no, content_end, line_end));
        }

        if width > max_line_length {
            let start = utf16_col(line, max_line_length);
            let mut diagnostic = warn(LINE_TOO_LONG, line_no, start, line_end);
            diagnostic.message = format!(
                "{} ({} > {} characters)",
                diagnostic.message, width, max_line_length
            );
            diagnostics.push(diagnostic);
        }
    }

    diagnostics
}
