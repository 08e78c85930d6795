//! Code-Action Provider
//!
//! Offers validate, lint and the combined action for a document. Only the
//! canonical entry file of a workflow can be validated; linting works on any
//! single file.

use serde_json::json;
use tower_lsp::lsp_types::{
    CodeAction, CodeActionDisabled, CodeActionKind, CodeActionOrCommand, Command, Url,
};

use crate::core::diagnostics::{Diagnostic, DiagnosticSource};
use crate::spec::tree::ROOT_NAME;
use crate::validation::engine::ValidationMode;

pub const VALIDATE_COMMAND: &str = "cylc.validate";
pub const LINT_COMMAND: &str = "cylc.lint";
pub const VALIDATE_AND_LINT_COMMAND: &str = "cylc.validateAndLint";

const NOT_ENTRY_FILE: &str = "Only the top level flow.cylc of a workflow can be validated";

/// Mode a code action command runs in, if it is one of ours
pub fn command_mode(command: &str) -> Option<ValidationMode> {
    match command {
        VALIDATE_COMMAND => Some(ValidationMode::ValidateOnly),
        LINT_COMMAND => Some(ValidationMode::LintOnly),
        VALIDATE_AND_LINT_COMMAND => Some(ValidationMode::Full),
        _ => None,
    }
}

/// Whether the URI's file name is the canonical entry file
pub fn is_entry_file(uri: &Url) -> bool {
    uri.path().rsplit('/').next() == Some(ROOT_NAME)
}

/// Actions for `uri`, carrying the diagnostics last published for it
pub fn code_actions(uri: &Url, published: &[Diagnostic]) -> Vec<CodeActionOrCommand> {
    let validatable = is_entry_file(uri);

    let action = |title: &str, command: &str, enabled: bool, sources: &[DiagnosticSource]| {
        let diagnostics: Vec<_> = published
            .iter()
            .filter(|d| sources.contains(&d.source))
            .map(Diagnostic::to_lsp)
            .collect();

        CodeActionOrCommand::CodeAction(CodeAction {
            title: title.to_string(),
            kind: Some(CodeActionKind::SOURCE),
            diagnostics: (!diagnostics.is_empty()).then_some(diagnostics),
            command: Some(Command {
                title: title.to_string(),
                command: command.to_string(),
                arguments: Some(vec![json!(uri)]),
            }),
            disabled: (!enabled).then(|| CodeActionDisabled {
                reason: NOT_ENTRY_FILE.to_string(),
            }),
            ..Default::default()
        })
    };

    vec![
        action(
            "cylc validate",
            VALIDATE_COMMAND,
            validatable,
            &[DiagnosticSource::Validate],
        ),
        action("cylc lint", LINT_COMMAND, true, &[DiagnosticSource::Lint]),
        action(
            "cylc validate + lint",
            VALIDATE_AND_LINT_COMMAND,
            validatable,
            &[DiagnosticSource::Lint, DiagnosticSource::Validate],
        ),
    ]
}
