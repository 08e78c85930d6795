//! Diagnostic Aggregator
//!
//! Fans a document out to the linter and the external validator and merges
//! the results into one list: lint diagnostics first, then at most one
//! validator diagnostic.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tower_lsp::lsp_types::Url;

use crate::core::diagnostics::Diagnostic;
use crate::lint::Linter;
use crate::validation::external::{workflow_dir, ExternalValidator, ValidatorOutcome};

/// Cancels the validator task when the run awaiting it goes away, which in
/// turn kills its subprocess
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub const DEFAULT_VALIDATE_TIMEOUT: Duration = Duration::from_secs(60);

/// Which collaborators a cycle runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Full,
    LintOnly,
    ValidateOnly,
}

impl ValidationMode {
    pub fn runs_linter(self) -> bool {
        matches!(self, ValidationMode::Full | ValidationMode::LintOnly)
    }

    pub fn runs_validator(self) -> bool {
        matches!(self, ValidationMode::Full | ValidationMode::ValidateOnly)
    }
}

pub struct Aggregator {
    linter: Arc<dyn Linter>,
    validator: Arc<dyn ExternalValidator>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(
        linter: Arc<dyn Linter>,
        validator: Arc<dyn ExternalValidator>,
        timeout: Duration,
    ) -> Self {
        Self {
            linter,
            validator,
            timeout,
        }
    }

    /// Compute the complete diagnostic list for one document
    pub async fn validate(&self, uri: &Url, text: &str, mode: ValidationMode) -> Vec<Diagnostic> {
        let mut diagnostics = if mode.runs_linter() {
            self.lint(text)
        } else {
            Vec::new()
        };

        if mode.runs_validator() {
            let outcome = match workflow_dir(uri) {
                Some(dir) => self.run_validator(dir).await,
                None => {
                    log::warn!("No workflow directory for {}", uri);
                    ValidatorOutcome::failed(format!(
                        "Cannot determine the workflow directory of {}",
                        uri
                    ))
                }
            };
            diagnostics.extend(outcome.into_diagnostic());
        }

        diagnostics
    }

    /// Lint `text`; empty text is never linted and a failing linter
    /// contributes nothing
    pub fn lint(&self, text: &str) -> Vec<Diagnostic> {
        if text.is_empty() {
            return Vec::new();
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.linter.lint(text))) {
            Ok(Ok(diagnostics)) => diagnostics,
            Ok(Err(e)) => {
                log::warn!("{}", e);
                Vec::new()
            }
            Err(_) => {
                log::error!("Linter panicked, dropping lint diagnostics for this cycle");
                Vec::new()
            }
        }
    }

    /// Run the validator on `dir`, bounded by the configured timeout.
    /// Timeouts and crashes of the validator task are failures.
    pub async fn run_validator(&self, dir: PathBuf) -> ValidatorOutcome {
        let validator = Arc::clone(&self.validator);
        let mut task = tokio::spawn(async move { validator.validate(&dir).await });
        let _abort_on_drop = AbortOnDrop(task.abort_handle());

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                log::error!("Validator task failed: {}", e);
                ValidatorOutcome::failed(format!("Internal error while validating: {}", e))
            }
            Err(_) => {
                log::warn!("Validator timed out after {:?}", self.timeout);
                ValidatorOutcome::failed(format!(
                    "Validation timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            }
        }
    }
}
