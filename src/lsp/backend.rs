use std::sync::Arc;

use serde_json::Value;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::lint::StyleLinter;
use crate::lsp::actions::{LINT_COMMAND, VALIDATE_AND_LINT_COMMAND, VALIDATE_COMMAND};
use crate::lsp::handlers::{
    HandleCodeAction, HandleCompletion, HandleExecuteCommand, REGISTER_COMPLETIONS,
    UNREGISTER_COMPLETIONS,
};
use crate::lsp::orchestrator::Orchestrator;
use crate::lsp::registration::RegistrationManager;
use crate::spec::{CompletionProvider, SpecTree};
use crate::validation::engine::Aggregator;
use crate::validation::external::CylcValidator;
use crate::Config;

const WORKFLOW_REFERENCE: &str =
    "https://cylc.github.io/cylc-doc/stable/html/reference/config/workflow.html";

/// The main LSP backend that holds state and implements the Language Server Protocol
pub struct Backend {
    pub client: Client,
    pub orchestrator: Orchestrator<Client>,
    pub registrations: RegistrationManager<Client>,
    pub completions: CompletionProvider,
    pub config: Config,
}

impl Backend {
    pub fn new(client: Client, config: Config, spec: SpecTree) -> Self {
        let aggregator = Aggregator::new(
            Arc::new(StyleLinter::new(config.max_line_length)),
            Arc::new(CylcValidator::new(
                config.validator.clone(),
                config.validator_args.clone(),
            )),
            config.validate_timeout,
        );
        Self::with_aggregator(client, config, spec, aggregator)
    }

    /// Build a backend around a custom linter/validator pair
    pub fn with_aggregator(
        client: Client,
        config: Config,
        spec: SpecTree,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(client.clone(), aggregator, config.validation_mode()),
            registrations: RegistrationManager::new(client.clone()),
            completions: CompletionProvider::new(&spec),
            client,
            config,
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(
        &self,
        _: InitializeParams,
    ) -> tower_lsp::jsonrpc::Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        will_save: None,
                        will_save_wait_until: None,
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![",".to_string()]),
                    work_done_progress_options: Default::default(),
                    all_commit_characters: None,
                    completion_item: None,
                }),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: [
                        VALIDATE_COMMAND,
                        LINT_COMMAND,
                        VALIDATE_AND_LINT_COMMAND,
                        REGISTER_COMPLETIONS,
                        UNREGISTER_COMPLETIONS,
                    ]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "cylc-language-server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "cylc-language-server initialized")
            .await;
    }

    async fn shutdown(&self) -> tower_lsp::jsonrpc::Result<()> {
        Ok(())
    }

    async fn completion(
        &self,
        params: CompletionParams,
    ) -> tower_lsp::jsonrpc::Result<Option<CompletionResponse>> {
        self.handle_completion(params).await
    }

    async fn code_action(
        &self,
        params: CodeActionParams,
    ) -> tower_lsp::jsonrpc::Result<Option<CodeActionResponse>> {
        self.handle_code_action(params).await
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> tower_lsp::jsonrpc::Result<Option<Value>> {
        self.handle_execute_command(params).await
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;

        self.client
            .show_message(
                MessageType::INFO,
                format!("Opened a Cylc Config\n[{}]", WORKFLOW_REFERENCE),
            )
            .await;

        self.orchestrator
            .on_open(doc.uri, doc.text, doc.version)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // Full sync: the last change carries the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            self.orchestrator
                .on_change(uri, change.text, Some(version))
                .await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        // The validator reads the workflow from disk, so saves matter
        let uri = params.text_document.uri;
        let mode = self.orchestrator.default_mode();
        if let Err(e) = self.orchestrator.revalidate(&uri, mode).await {
            log::warn!("{}", e);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.orchestrator.on_close(params.text_document.uri).await;
        self.client
            .show_message(MessageType::INFO, "Closed Cylc Config")
            .await;
    }
}
