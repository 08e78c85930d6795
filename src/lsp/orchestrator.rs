//! Validation Orchestrator
//!
//! Binds document lifecycle events to the aggregator and to publication.
//! Every open, change and revalidation starts a new generation for its
//! document. Starting a cycle cancels the one in flight for that document,
//! and a cycle publishes only while its generation is still current, so a
//! slow run can never overwrite the result of a newer one.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_lsp::lsp_types::{MessageType, Url};

use crate::core::diagnostics::Diagnostic;
use crate::core::document::{DocumentError, DocumentStore, Snapshot};
use crate::lsp::client::ClientSink;
use crate::validation::engine::{Aggregator, ValidationMode};

pub struct Orchestrator<C: ClientSink> {
    client: C,
    documents: Arc<Mutex<DocumentStore>>,
    aggregator: Arc<Aggregator>,
    default_mode: ValidationMode,
}

/// A cycle that has been started and attached to its document
struct Cycle {
    uri: Url,
    version: i32,
    generation: u64,
    task: JoinHandle<Vec<Diagnostic>>,
}

impl<C: ClientSink> Orchestrator<C> {
    pub fn new(client: C, aggregator: Aggregator, default_mode: ValidationMode) -> Self {
        Self {
            client,
            documents: Arc::new(Mutex::new(DocumentStore::new())),
            aggregator: Arc::new(aggregator),
            default_mode,
        }
    }

    pub fn documents(&self) -> &Arc<Mutex<DocumentStore>> {
        &self.documents
    }

    pub fn default_mode(&self) -> ValidationMode {
        self.default_mode
    }

    pub async fn on_open(&self, uri: Url, text: String, version: i32) {
        let cycle = {
            let mut documents = self.documents.lock().await;
            let snapshot = documents.open(uri.clone(), text, version);
            self.start_cycle(&mut documents, uri, snapshot, self.default_mode)
        };
        self.finish_cycle(cycle).await;
    }

    pub async fn on_change(&self, uri: Url, text: String, version: Option<i32>) {
        let cycle = {
            let mut documents = self.documents.lock().await;
            match documents.update(&uri, text, version) {
                Ok(snapshot) => {
                    let mode = self.default_mode;
                    Ok(self.start_cycle(&mut documents, uri, snapshot, mode))
                }
                Err(e) => Err(e),
            }
        };
        match cycle {
            Ok(cycle) => self.finish_cycle(cycle).await,
            Err(e @ DocumentError::StaleVersion { .. }) => log::debug!("{}", e),
            Err(e) => self.report_unknown(e).await,
        }
    }

    /// Forget the document and clear its diagnostics in the editor
    pub async fn on_close(&self, uri: Url) {
        if self.documents.lock().await.close(&uri).is_none() {
            log::debug!("Close for a document that was not open: {}", uri);
        }
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    /// Validate the current text again, superseding any cycle in flight
    pub async fn revalidate(&self, uri: &Url, mode: ValidationMode) -> Result<(), DocumentError> {
        let cycle = {
            let mut documents = self.documents.lock().await;
            let snapshot = documents.touch(uri)?;
            self.start_cycle(&mut documents, uri.clone(), snapshot, mode)
        };
        self.finish_cycle(cycle).await;
        Ok(())
    }

    /// Diagnostics last published for `uri`
    pub async fn published(&self, uri: &Url) -> Vec<Diagnostic> {
        self.documents.lock().await.published(uri).to_vec()
    }

    /// Spawn the aggregation for `snapshot` and attach it to the document,
    /// in the same critical section that bumped the generation. Starting a
    /// newer cycle cancels this one.
    fn start_cycle(
        &self,
        documents: &mut DocumentStore,
        uri: Url,
        snapshot: Snapshot,
        mode: ValidationMode,
    ) -> Cycle {
        let aggregator = Arc::clone(&self.aggregator);
        let task_uri = uri.clone();
        let text = snapshot.text;
        let task =
            tokio::spawn(async move { aggregator.validate(&task_uri, &text, mode).await });

        documents.start_cycle(&uri, snapshot.generation, task.abort_handle());

        Cycle {
            uri,
            version: snapshot.version,
            generation: snapshot.generation,
            task,
        }
    }

    async fn finish_cycle(&self, cycle: Cycle) {
        self.client
            .log_message(MessageType::INFO, "Validating cylc...".to_string())
            .await;

        match cycle.task.await {
            Ok(diagnostics) => {
                self.publish(cycle.uri, cycle.version, cycle.generation, diagnostics)
                    .await;
            }
            Err(e) if e.is_cancelled() => {
                log::debug!(
                    "Validation of {} (generation {}) was superseded",
                    cycle.uri,
                    cycle.generation
                );
            }
            Err(e) => log::error!("Validation task for {} failed: {}", cycle.uri, e),
        }
    }

    /// Publish the full diagnostic set unless the cycle went stale. Only
    /// the bookkeeping happens under the store lock.
    async fn publish(
        &self,
        uri: Url,
        version: i32,
        generation: u64,
        diagnostics: Vec<Diagnostic>,
    ) -> bool {
        let lsp_diagnostics = diagnostics.iter().map(Diagnostic::to_lsp).collect();

        let recorded = self
            .documents
            .lock()
            .await
            .record_diagnostics(&uri, generation, diagnostics);
        if !recorded {
            log::debug!(
                "Discarding stale diagnostics for {} (generation {})",
                uri,
                generation
            );
            return false;
        }

        self.client
            .publish_diagnostics(uri, lsp_diagnostics, Some(version))
            .await;
        true
    }

    async fn report_unknown(&self, error: DocumentError) {
        log::warn!("{}", error);
        self.client
            .log_message(MessageType::WARNING, error.to_string())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::{DiagnosticSource, Severity, TextRange};
    use crate::lint::{LintError, Linter, StyleLinter};
    use crate::lsp::client::recording::{Event, RecordingClient};
    use crate::validation::engine::DEFAULT_VALIDATE_TIMEOUT;
    use crate::validation::external::{ExternalValidator, ValidatorOutcome};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;
    use std::time::Duration;
    use tower_lsp::jsonrpc::Result as LspResult;
    use tower_lsp::lsp_types::{self, DiagnosticSeverity, Registration, Unregistration};

    /// Fails like `cylc validate` does on a workflow with no usable sections
    struct MissingSectionValidator;

    #[tower_lsp::async_trait]
    impl ExternalValidator for MissingSectionValidator {
        async fn validate(&self, _: &Path) -> ValidatorOutcome {
            ValidatorOutcome::failed(
                "WorkflowConfigError: Top level section [scheduling] is missing",
            )
        }
    }

    /// First run is slow, later runs are immediate
    struct SlowFirstValidator {
        calls: AtomicUsize,
    }

    #[tower_lsp::async_trait]
    impl ExternalValidator for SlowFirstValidator {
        async fn validate(&self, _: &Path) -> ValidatorOutcome {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            ValidatorOutcome::Passed
        }
    }

    /// Counts runs in flight; each run takes 200ms unless cancelled
    #[derive(Default)]
    struct CountingValidator {
        running: Arc<AtomicUsize>,
        peak: AtomicUsize,
        finished: AtomicUsize,
    }

    struct Running(Arc<AtomicUsize>);

    impl Drop for Running {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tower_lsp::async_trait]
    impl ExternalValidator for CountingValidator {
        async fn validate(&self, _: &Path) -> ValidatorOutcome {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            let _running = Running(Arc::clone(&self.running));
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(200)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            ValidatorOutcome::Passed
        }
    }

    /// Notes whether the document store was free while publishing
    #[derive(Clone, Default)]
    struct LockCheckingClient {
        store: Arc<OnceLock<Arc<Mutex<DocumentStore>>>>,
        store_free: Arc<std::sync::Mutex<Vec<bool>>>,
    }

    #[tower_lsp::async_trait]
    impl ClientSink for LockCheckingClient {
        async fn publish_diagnostics(
            &self,
            _uri: Url,
            _diagnostics: Vec<lsp_types::Diagnostic>,
            _version: Option<i32>,
        ) {
            if let Some(store) = self.store.get() {
                let free = store.try_lock().is_ok();
                self.store_free.lock().unwrap().push(free);
            }
        }

        async fn show_message(&self, _typ: MessageType, _message: String) {}

        async fn log_message(&self, _typ: MessageType, _message: String) {}

        async fn register_capability(&self, _: Vec<Registration>) -> LspResult<()> {
            Ok(())
        }

        async fn unregister_capability(&self, _: Vec<Unregistration>) -> LspResult<()> {
            Ok(())
        }
    }

    /// Echoes the text so tests can tell which revision was linted
    struct EchoLinter;

    impl Linter for EchoLinter {
        fn lint(&self, text: &str) -> Result<Vec<Diagnostic>, LintError> {
            Ok(vec![Diagnostic::new(
                DiagnosticSource::Lint,
                Severity::Info,
                TextRange::on_line(0, 0, 1),
                text,
            )])
        }
    }

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///workflows/demo/{}", name)).unwrap()
    }

    fn orchestrator(
        client: RecordingClient,
        linter: Arc<dyn Linter>,
        validator: Arc<dyn ExternalValidator>,
    ) -> Orchestrator<RecordingClient> {
        let aggregator = Aggregator::new(linter, validator, DEFAULT_VALIDATE_TIMEOUT);
        Orchestrator::new(client, aggregator, ValidationMode::Full)
    }

    #[tokio::test]
    async fn test_open_indented_meta_publishes_lint_and_validate() {
        let client = RecordingClient::default();
        let orchestrator = orchestrator(
            client.clone(),
            Arc::new(StyleLinter::default()),
            Arc::new(MissingSectionValidator),
        );

        orchestrator
            .on_open(uri("flow.cylc"), "    [meta]".to_string(), 1)
            .await;

        let published = client.published();
        assert_eq!(published.len(), 1);
        let (published_uri, diagnostics) = &published[0];
        assert_eq!(published_uri, &uri("flow.cylc"));

        assert_eq!(diagnostics[0].source.as_deref(), Some("cylc lint"));
        assert!(diagnostics[0].message.contains("S003"));

        let validate = diagnostics
            .iter()
            .find(|d| d.source.as_deref() == Some("cylc validate"))
            .expect("validator diagnostic");
        assert!(validate.message.contains("Top level section"));
        assert_eq!(validate.severity, Some(DiagnosticSeverity::ERROR));

        let events = client.events();
        assert!(matches!(
            &events[0],
            Event::Logged(MessageType::INFO, message) if message == "Validating cylc..."
        ));
        assert!(matches!(
            events.last(),
            Some(Event::Published { version: Some(1), .. })
        ));

        assert_eq!(orchestrator.published(&uri("flow.cylc")).await.len(), 2);
    }

    #[tokio::test]
    async fn test_change_to_empty_text_still_validates() {
        let client = RecordingClient::default();
        let orchestrator = orchestrator(
            client.clone(),
            Arc::new(StyleLinter::default()),
            Arc::new(MissingSectionValidator),
        );

        orchestrator
            .on_open(uri("flow.cylc"), "    [meta]".to_string(), 1)
            .await;
        orchestrator
            .on_change(uri("flow.cylc"), String::new(), Some(2))
            .await;

        let published = client.published();
        let (_, diagnostics) = published.last().unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].source.as_deref(), Some("cylc validate"));
    }

    #[tokio::test]
    async fn test_stale_cycle_does_not_overwrite_newer_result() {
        let client = RecordingClient::default();
        let orchestrator = orchestrator(
            client.clone(),
            Arc::new(EchoLinter),
            Arc::new(SlowFirstValidator {
                calls: AtomicUsize::new(0),
            }),
        );
        let doc = uri("flow.cylc");
        orchestrator.documents().lock().await.open(doc.clone(), String::new(), 0);

        tokio::join!(
            orchestrator.on_change(doc.clone(), "first".to_string(), Some(1)),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                orchestrator
                    .on_change(doc.clone(), "second".to_string(), Some(2))
                    .await;
            }
        );

        let published = client.published();
        assert_eq!(published.len(), 1, "the slow first cycle must be discarded");
        assert_eq!(published[0].1[0].message, "second");
        assert_eq!(orchestrator.published(&doc).await[0].message, "second");
    }

    #[tokio::test]
    async fn test_rapid_changes_keep_one_validator_run_in_flight() {
        let client = RecordingClient::default();
        let validator = Arc::new(CountingValidator::default());
        let orchestrator = orchestrator(
            client.clone(),
            Arc::new(StyleLinter::default()),
            validator.clone(),
        );
        let doc = uri("flow.cylc");
        orchestrator.documents().lock().await.open(doc.clone(), String::new(), 0);

        let change = |version: i32| {
            let orchestrator = &orchestrator;
            let doc = doc.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10 * version as u64)).await;
                orchestrator
                    .on_change(doc, format!("[meta] # v{}", version), Some(version))
                    .await;
            }
        };
        tokio::join!(change(1), change(2), change(3), change(4));

        assert_eq!(validator.peak.load(Ordering::SeqCst), 1);
        assert_eq!(validator.finished.load(Ordering::SeqCst), 1);
        assert_eq!(validator.running.load(Ordering::SeqCst), 0);

        let published = client.published();
        assert_eq!(published.len(), 1);
        assert!(matches!(
            client.events().last(),
            Some(Event::Published { version: Some(4), .. })
        ));
        assert!(!orchestrator.documents().lock().await.in_flight(&doc));
    }

    #[tokio::test]
    async fn test_late_older_change_is_ignored() {
        let client = RecordingClient::default();
        let orchestrator = orchestrator(
            client.clone(),
            Arc::new(EchoLinter),
            Arc::new(MissingSectionValidator),
        );
        let doc = uri("flow.cylc");

        orchestrator.on_open(doc.clone(), "v1".to_string(), 1).await;
        orchestrator.on_change(doc.clone(), "v3".to_string(), Some(3)).await;
        orchestrator.on_change(doc.clone(), "v2".to_string(), Some(2)).await;

        assert_eq!(client.published().len(), 2);
        assert_eq!(orchestrator.documents().lock().await.get(&doc), Ok("v3"));
        assert_eq!(orchestrator.published(&doc).await[0].message, "v3");
        assert!(!client
            .events()
            .iter()
            .any(|event| matches!(event, Event::Logged(MessageType::WARNING, _))));
    }

    #[tokio::test]
    async fn test_store_is_unlocked_while_publishing() {
        let client = LockCheckingClient::default();
        let aggregator = Aggregator::new(
            Arc::new(StyleLinter::default()),
            Arc::new(MissingSectionValidator),
            DEFAULT_VALIDATE_TIMEOUT,
        );
        let orchestrator = Orchestrator::new(client.clone(), aggregator, ValidationMode::Full);
        let _ = client.store.set(Arc::clone(orchestrator.documents()));

        orchestrator
            .on_open(uri("flow.cylc"), "[meta]".to_string(), 1)
            .await;
        orchestrator
            .revalidate(&uri("flow.cylc"), ValidationMode::LintOnly)
            .await
            .unwrap();

        assert_eq!(*client.store_free.lock().unwrap(), vec![true, true]);
    }

    #[tokio::test]
    async fn test_close_clears_diagnostics_and_forgets_document() {
        let client = RecordingClient::default();
        let orchestrator = orchestrator(
            client.clone(),
            Arc::new(StyleLinter::default()),
            Arc::new(MissingSectionValidator),
        );
        let doc = uri("flow.cylc");

        orchestrator.on_open(doc.clone(), "[meta]".to_string(), 1).await;
        orchestrator.on_close(doc.clone()).await;

        let (cleared_uri, cleared) = client.published().pop().unwrap();
        assert_eq!(cleared_uri, doc);
        assert!(cleared.is_empty());
        assert!(orchestrator.documents().lock().await.get(&doc).is_err());

        // closing twice is harmless
        orchestrator.on_close(doc.clone()).await;
    }

    #[tokio::test]
    async fn test_change_for_unknown_document_is_reported_not_fatal() {
        let client = RecordingClient::default();
        let orchestrator = orchestrator(
            client.clone(),
            Arc::new(StyleLinter::default()),
            Arc::new(MissingSectionValidator),
        );

        orchestrator
            .on_change(uri("flow.cylc"), "[meta]".to_string(), None)
            .await;

        assert!(client.published().is_empty());
        assert!(client.events().iter().any(|event| matches!(
            event,
            Event::Logged(MessageType::WARNING, message) if message.contains("not open")
        )));

        // other documents keep working
        orchestrator.on_open(uri("other.cylc"), "[meta]".to_string(), 1).await;
        assert_eq!(client.published().len(), 1);
    }

    #[tokio::test]
    async fn test_revalidate_lint_only() {
        let client = RecordingClient::default();
        let orchestrator = orchestrator(
            client.clone(),
            Arc::new(StyleLinter::default()),
            Arc::new(MissingSectionValidator),
        );
        let doc = uri("flow.cylc");

        assert!(orchestrator
            .revalidate(&doc, ValidationMode::LintOnly)
            .await
            .is_err());

        orchestrator.on_open(doc.clone(), "  [meta]".to_string(), 1).await;
        orchestrator
            .revalidate(&doc, ValidationMode::LintOnly)
            .await
            .unwrap();

        let (_, diagnostics) = client.published().pop().unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].source.as_deref(), Some("cylc lint"));
    }
}
