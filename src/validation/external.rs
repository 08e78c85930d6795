//! External Validator
//!
//! The structural checker runs over a whole workflow directory and reports
//! at most one failure per run.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tower_lsp::lsp_types::Url;

use crate::core::diagnostics::{Diagnostic, DiagnosticSource, Severity, TextRange};

/// Width of the synthetic range on the failing line
pub const FAILURE_SPAN: u32 = 10;

/// Result of one validator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorOutcome {
    Passed,
    Failed {
        message: String,
        /// 0-based line of the failure, when the validator names one
        line: Option<u32>,
    },
}

impl ValidatorOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        ValidatorOutcome::Failed {
            message: message.into(),
            line: None,
        }
    }

    /// The single diagnostic describing this outcome, if it is a failure
    pub fn into_diagnostic(self) -> Option<Diagnostic> {
        match self {
            ValidatorOutcome::Passed => None,
            ValidatorOutcome::Failed { message, line } => {
                let line = line.unwrap_or(0);
                Some(Diagnostic::new(
                    DiagnosticSource::Validate,
                    Severity::Error,
                    TextRange::on_line(line, 0, FAILURE_SPAN),
                    message,
                ))
            }
        }
    }
}

/// A checker that validates a workflow directory
#[tower_lsp::async_trait]
pub trait ExternalValidator: Send + Sync + 'static {
    async fn validate(&self, dir: &Path) -> ValidatorOutcome;
}

/// Directory the validator should run in for a document
pub fn workflow_dir(uri: &Url) -> Option<PathBuf> {
    let path = uri
        .to_file_path()
        .unwrap_or_else(|_| PathBuf::from(uri.path()));
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Runs `<program> <args...> <dir>`, `cylc validate <dir>` by default
#[derive(Debug, Clone)]
pub struct CylcValidator {
    program: String,
    args: Vec<String>,
}

impl CylcValidator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for CylcValidator {
    fn default() -> Self {
        Self::new("cylc", vec!["validate".to_string()])
    }
}

#[tower_lsp::async_trait]
impl ExternalValidator for CylcValidator {
    async fn validate(&self, dir: &Path) -> ValidatorOutcome {
        log::debug!("Running {} {:?} on {}", self.program, self.args, dir.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => ValidatorOutcome::Passed,
            Ok(output) => parse_failure(
                &String::from_utf8_lossy(&output.stderr),
                &String::from_utf8_lossy(&output.stdout),
                &output.status.to_string(),
            ),
            Err(e) => {
                log::warn!("Failed to run validator '{}': {}", self.program, e);
                ValidatorOutcome::failed(format!("Could not run '{}': {}", self.program, e))
            }
        }
    }
}

/// Extract the failure message and line from validator output
///
/// The message is the last non-empty line of stderr, else of stdout, else
/// the exit status. A `line N` mention is read as 1-based.
pub fn parse_failure(stderr: &str, stdout: &str, status: &str) -> ValidatorOutcome {
    let last_line = |text: &str| {
        text.lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(str::to_string)
    };

    let message = last_line(stderr)
        .or_else(|| last_line(stdout))
        .unwrap_or_else(|| format!("validation failed ({})", status));

    let line_re = regex::Regex::new(r"(?i)\bline\s*:?\s*(\d+)");
    let line = line_re
        .ok()
        .and_then(|re| re.captures(&message).or_else(|| re.captures(stderr)))
        .and_then(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .map(|line| line.saturating_sub(1));

    ValidatorOutcome::Failed { message, line }
}
